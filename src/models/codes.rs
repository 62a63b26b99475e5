use chrono::{DateTime, Utc};

use super::amount::Amount;

/// A redeemable reward code. Immutable once issued; the ledger only reads
/// these.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RedemptionCode {
    pub code: String,
    pub reward_amount: Amount,
    pub valid_until: DateTime<Utc>,
}

impl RedemptionCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until < now
    }
}

/// Canonical form of a user-entered code: whitespace-trimmed, lowercased.
/// The redemption fence is keyed on this form, so two spellings of the same
/// code cannot be redeemed twice.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_code("  WELCOME24 "), "welcome24");
        assert_eq!(normalize_code("bonus"), "bonus");
    }
}
