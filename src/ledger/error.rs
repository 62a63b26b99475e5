use crate::models::amount::Amount;

/// Broad failure classes, used by the HTTP layer to pick a status code and
/// by the retry harness to decide what is retryable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Expected, user-facing; retrying without new input cannot succeed.
    Precondition,
    /// The referenced entity does not exist; terminal for this request.
    NotFound,
    /// The request was already applied; repeating it is a safe no-op.
    AlreadyProcessed,
    /// A concurrent writer raced the same rows; the whole unit is retried.
    Conflict,
    /// The store itself failed; nothing was committed.
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Account not found.")]
    AccountNotFound,
    #[error("You have already checked in today.")]
    CheckInCooldown,
    #[error("A mining session is already running.")]
    SessionActive,
    #[error("Your mining session is not ready to claim yet.")]
    NotClaimable,
    #[error("You have already redeemed this code.")]
    AlreadyRedeemed,
    #[error("Invalid or expired code.")]
    InvalidCode,
    #[error("This code has expired.")]
    CodeExpired,
    #[error("Recipient not found.")]
    RecipientNotFound,
    #[error("You cannot send tokens to your own account.")]
    SelfTransfer,
    #[error("Complete KYC verification to send tokens.")]
    KycRequired,
    #[error("Amount must be positive.")]
    InvalidAmount,
    #[error("The minimum amount is {min} {unit}.")]
    BelowMinimum { min: Amount, unit: &'static str },
    #[error("Insufficient {0} balance.")]
    InsufficientBalance(&'static str),
    #[error("Ads are not available right now.")]
    AdsDisabled,
    #[error("The operation could not be completed, please try again.")]
    Conflict,
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::CheckInCooldown
            | LedgerError::SessionActive
            | LedgerError::NotClaimable
            | LedgerError::CodeExpired
            | LedgerError::SelfTransfer
            | LedgerError::KycRequired
            | LedgerError::InvalidAmount
            | LedgerError::BelowMinimum { .. }
            | LedgerError::InsufficientBalance(_)
            | LedgerError::AdsDisabled => ErrorKind::Precondition,
            LedgerError::AccountNotFound
            | LedgerError::InvalidCode
            | LedgerError::RecipientNotFound => ErrorKind::NotFound,
            LedgerError::AlreadyRedeemed => ErrorKind::AlreadyProcessed,
            LedgerError::Conflict => ErrorKind::Conflict,
            LedgerError::Store(_) => ErrorKind::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(LedgerError::CheckInCooldown.kind(), ErrorKind::Precondition);
        assert_eq!(
            LedgerError::InsufficientBalance("Fair").kind(),
            ErrorKind::Precondition
        );
        assert_eq!(LedgerError::RecipientNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            LedgerError::AlreadyRedeemed.kind(),
            ErrorKind::AlreadyProcessed
        );
        assert_eq!(LedgerError::Conflict.kind(), ErrorKind::Conflict);
        assert_eq!(
            LedgerError::Store("connection reset".into()).kind(),
            ErrorKind::Unavailable
        );
    }
}
