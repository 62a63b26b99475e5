use std::fmt;

use serde::{Deserialize, Serialize};

/// Monetary amount in cents.
///
/// All four balance units (Fair, FairX, USDT and the unverified Fair pool)
/// share two-decimal precision, so amounts are stored and computed as
/// integer cents. The only lossy step is applying an exchange rate, which
/// rounds half-up to the nearest cent; the same rule is used everywhere so
/// repeated partial conversions cannot leak value.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    /// Converts a display-unit value (e.g. `49.7`) into cents, round-half-up.
    pub fn from_units(units: f64) -> Self {
        Amount((units * 100.0).round() as i64)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Subtraction that refuses to go below zero. Balances are non-negative
    /// by invariant, so a `None` here means the operation is not payable.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        match self.0.checked_sub(other.0) {
            Some(v) if v >= 0 => Some(Amount(v)),
            _ => None,
        }
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Applies an exchange rate, rounding half-up to the nearest cent.
    pub fn mul_rate(self, rate: f64) -> Amount {
        Amount((self.0 as f64 * rate).round() as i64)
    }
}

impl std::ops::Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_units_rounds_half_up_to_cents() {
        assert_eq!(Amount::from_units(0.3).cents(), 30);
        assert_eq!(Amount::from_units(50.0).cents(), 5000);
        assert_eq!(Amount::from_units(0.125).cents(), 13);
        assert_eq!(Amount::from_units(0.114).cents(), 11);
    }

    #[test]
    fn mul_rate_rounds_half_up_to_cents() {
        // 150.00 FairX at 0.1 is exactly 15.00 Fair.
        assert_eq!(Amount::from_cents(15_000).mul_rate(0.1).cents(), 1_500);
        // 0.05 at 0.1 is 0.005, which rounds up to a cent.
        assert_eq!(Amount::from_cents(5).mul_rate(0.1).cents(), 1);
        // 0.04 at 0.1 is 0.004, which rounds down.
        assert_eq!(Amount::from_cents(4).mul_rate(0.1).cents(), 0);
    }

    #[test]
    fn checked_sub_refuses_negative_results() {
        let balance = Amount::from_cents(100);
        assert_eq!(
            balance.checked_sub(Amount::from_cents(30)),
            Some(Amount::from_cents(70))
        );
        assert_eq!(balance.checked_sub(Amount::from_cents(101)), None);
        assert_eq!(
            balance.checked_sub(Amount::from_cents(100)),
            Some(Amount::ZERO)
        );
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Amount::from_cents(4_970).to_string(), "49.70");
        assert_eq!(Amount::from_cents(30).to_string(), "0.30");
        assert_eq!(Amount::from_cents(-5_000).to_string(), "-50.00");
    }
}
