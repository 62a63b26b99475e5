//! The transition catalog: validation and amount computation for every
//! ledger operation, as pure functions of a transactional account snapshot,
//! a config snapshot and the server-observed clock.
//!
//! Nothing here touches the store. The repository calls these inside its
//! transaction and applies the returned amounts; on a serialization retry
//! the whole function runs again against the fresh snapshot, so no
//! precondition is ever evaluated against stale data.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::error::LedgerError;
use crate::models::account::{Account, Asset};
use crate::models::amount::Amount;
use crate::models::codes::RedemptionCode;

pub const CHECK_IN_COOLDOWN_HOURS: i64 = 24;
pub const MINING_DURATION_HOURS: i64 = 24;

/// Reward amounts, from the config snapshot taken at call time.
#[derive(Clone, Copy, Debug)]
pub struct RewardSchedule {
    pub daily_check_in: Amount,
    pub mining: Amount,
    pub ad_bonus: Amount,
}

/// Per-asset transfer fee and minimum.
#[derive(Clone, Copy, Debug)]
pub struct FeeSchedule {
    pub fair_fee: Amount,
    pub fair_min_send: Amount,
    pub usdt_fee: Amount,
    pub usdt_min_send: Amount,
}

impl FeeSchedule {
    pub fn fee(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Fair => self.fair_fee,
            Asset::Usdt => self.usdt_fee,
        }
    }

    pub fn min_send(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Fair => self.fair_min_send,
            Asset::Usdt => self.usdt_min_send,
        }
    }
}

/// FairX -> Fair conversion terms. A fixed rate, no fee.
#[derive(Clone, Copy, Debug)]
pub struct SwapTerms {
    pub fairx_to_fair_rate: f64,
    pub min_amount: Amount,
}

/// The atomic effect of a peer transfer. Conservation holds by
/// construction: `total_debit == amount + fee`.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct TransferPlan {
    pub asset: Asset,
    pub amount: Amount,
    pub fee: Amount,
    pub total_debit: Amount,
}

/// The atomic effect of a FairX -> Fair swap.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct SwapPlan {
    pub debit: Amount,
    pub credit: Amount,
}

/// Daily check-in: eligible when `last_check_in` is absent or the 24h
/// cooldown has elapsed. Returns the reward to credit to the verified
/// balance; the caller also sets `last_check_in = now`.
pub fn daily_check_in(
    account: &Account,
    schedule: &RewardSchedule,
    now: DateTime<Utc>,
) -> Result<Amount, LedgerError> {
    if let Some(last) = account.last_check_in {
        if now < last + Duration::hours(CHECK_IN_COOLDOWN_HOURS) {
            return Err(LedgerError::CheckInCooldown);
        }
    }
    Ok(schedule.daily_check_in)
}

/// Mining start: legal only from Idle. A running or claimable session must
/// be claimed (or, while running, waited out) first.
pub fn start_mining(account: &Account) -> Result<(), LedgerError> {
    if account.mining_started_at.is_some() {
        return Err(LedgerError::SessionActive);
    }
    Ok(())
}

/// Mining claim: legal only when a session exists and the full duration has
/// elapsed against the server-observed start timestamp. Returns the reward;
/// the caller also clears `mining_started_at`.
pub fn claim_mining(
    account: &Account,
    schedule: &RewardSchedule,
    now: DateTime<Utc>,
) -> Result<Amount, LedgerError> {
    let started = account.mining_started_at.ok_or(LedgerError::NotClaimable)?;
    if now < started + Duration::hours(MINING_DURATION_HOURS) {
        return Err(LedgerError::NotClaimable);
    }
    Ok(schedule.mining)
}

/// Code redemption: the fence check comes first so a consumed code reports
/// `AlreadyRedeemed` even after it expires.
pub fn redeem_code(
    already_redeemed: bool,
    code: Option<&RedemptionCode>,
    now: DateTime<Utc>,
) -> Result<Amount, LedgerError> {
    if already_redeemed {
        return Err(LedgerError::AlreadyRedeemed);
    }
    let code = code.ok_or(LedgerError::InvalidCode)?;
    if code.is_expired(now) {
        return Err(LedgerError::CodeExpired);
    }
    Ok(code.reward_amount)
}

/// Peer transfer preconditions and amounts. The recipient lookup happens in
/// the repository, inside the same transaction.
pub fn prepare_transfer(
    sender: &Account,
    asset: Asset,
    amount: Amount,
    fees: &FeeSchedule,
) -> Result<TransferPlan, LedgerError> {
    if !sender.kyc_status.is_approved() {
        return Err(LedgerError::KycRequired);
    }
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount);
    }
    let min = fees.min_send(asset);
    if amount < min {
        return Err(LedgerError::BelowMinimum {
            min,
            unit: asset.display_name(),
        });
    }
    let fee = fees.fee(asset);
    let total_debit = amount.checked_add(fee).ok_or(LedgerError::InvalidAmount)?;
    if sender.balance(asset).checked_sub(total_debit).is_none() {
        return Err(LedgerError::InsufficientBalance(asset.display_name()));
    }
    Ok(TransferPlan {
        asset,
        amount,
        fee,
        total_debit,
    })
}

/// FairX -> Fair swap preconditions and amounts. The credit side is the
/// debit times the fixed rate, rounded half-up to cents.
pub fn prepare_swap(
    account: &Account,
    amount: Amount,
    terms: &SwapTerms,
) -> Result<SwapPlan, LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount);
    }
    if amount < terms.min_amount {
        return Err(LedgerError::BelowMinimum {
            min: terms.min_amount,
            unit: "FairX",
        });
    }
    if account.fairx_balance.checked_sub(amount).is_none() {
        return Err(LedgerError::InsufficientBalance("FairX"));
    }
    Ok(SwapPlan {
        debit: amount,
        credit: amount.mul_rate(terms.fairx_to_fair_rate),
    })
}

/// Ad bonus: an independent credit, granted only while ads are enabled. The
/// base reward it follows has already committed on its own.
pub fn ad_bonus(schedule: &RewardSchedule, ads_enabled: bool) -> Result<Amount, LedgerError> {
    if !ads_enabled || !schedule.ad_bonus.is_positive() {
        return Err(LedgerError::AdsDisabled);
    }
    Ok(schedule.ad_bonus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::{KycStatus, Referrals};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn account() -> Account {
        Account {
            user_id: "alice".into(),
            email: "alice@example.com".into(),
            verified_balance: Amount::from_units(100.0),
            unverified_balance: Amount::ZERO,
            usdt_balance: Amount::from_units(25.0),
            fairx_balance: Amount::from_units(150.0),
            last_check_in: None,
            mining_started_at: None,
            kyc_status: KycStatus::Approved,
            referrals: Referrals::default(),
        }
    }

    fn schedule() -> RewardSchedule {
        RewardSchedule {
            daily_check_in: Amount::from_units(1.0),
            mining: Amount::from_units(2.0),
            ad_bonus: Amount::from_units(0.5),
        }
    }

    fn fees() -> FeeSchedule {
        FeeSchedule {
            fair_fee: Amount::from_units(0.3),
            fair_min_send: Amount::from_units(50.0),
            usdt_fee: Amount::ZERO,
            usdt_min_send: Amount::ZERO,
        }
    }

    fn terms() -> SwapTerms {
        SwapTerms {
            fairx_to_fair_rate: 0.1,
            min_amount: Amount::from_units(100.0),
        }
    }

    #[test]
    fn first_check_in_succeeds() {
        let reward = daily_check_in(&account(), &schedule(), t0()).unwrap();
        assert_eq!(reward, Amount::from_units(1.0));
    }

    #[test]
    fn check_in_inside_cooldown_is_rejected() {
        let mut acct = account();
        acct.last_check_in = Some(t0());
        let later = t0() + Duration::hours(23) + Duration::minutes(59);
        assert!(matches!(
            daily_check_in(&acct, &schedule(), later),
            Err(LedgerError::CheckInCooldown)
        ));
    }

    #[test]
    fn check_in_at_the_cooldown_boundary_succeeds() {
        let mut acct = account();
        acct.last_check_in = Some(t0());
        let boundary = t0() + Duration::hours(CHECK_IN_COOLDOWN_HOURS);
        assert!(daily_check_in(&acct, &schedule(), boundary).is_ok());
    }

    #[test]
    fn start_mining_only_from_idle() {
        assert!(start_mining(&account()).is_ok());

        let mut running = account();
        running.mining_started_at = Some(t0());
        assert!(matches!(
            start_mining(&running),
            Err(LedgerError::SessionActive)
        ));

        // An elapsed-but-unclaimed session still blocks a restart.
        let mut claimable = account();
        claimable.mining_started_at = Some(t0() - Duration::hours(30));
        assert!(matches!(
            start_mining(&claimable),
            Err(LedgerError::SessionActive)
        ));
    }

    #[test]
    fn claim_from_idle_or_running_is_rejected() {
        assert!(matches!(
            claim_mining(&account(), &schedule(), t0()),
            Err(LedgerError::NotClaimable)
        ));

        let mut running = account();
        running.mining_started_at = Some(t0());
        assert!(matches!(
            claim_mining(&running, &schedule(), t0() + Duration::hours(23)),
            Err(LedgerError::NotClaimable)
        ));
        // The snapshot is untouched on failure.
        assert_eq!(running.mining_started_at, Some(t0()));
    }

    #[test]
    fn claim_after_full_duration_pays_the_mining_reward() {
        let mut acct = account();
        acct.mining_started_at = Some(t0());
        let reward =
            claim_mining(&acct, &schedule(), t0() + Duration::hours(MINING_DURATION_HOURS))
                .unwrap();
        assert_eq!(reward, Amount::from_units(2.0));
    }

    fn code(valid_until: DateTime<Utc>) -> RedemptionCode {
        RedemptionCode {
            code: "welcome24".into(),
            reward_amount: Amount::from_units(5.0),
            valid_until,
        }
    }

    #[test]
    fn redeem_unknown_code_fails() {
        assert!(matches!(
            redeem_code(false, None, t0()),
            Err(LedgerError::InvalidCode)
        ));
    }

    #[test]
    fn redeem_expired_code_fails_regardless_of_reward() {
        let expired = code(t0() - Duration::hours(1));
        assert!(matches!(
            redeem_code(false, Some(&expired), t0()),
            Err(LedgerError::CodeExpired)
        ));
    }

    #[test]
    fn redeem_is_idempotent_via_the_fence() {
        let c = code(t0() + Duration::days(1));

        // First attempt wins and would write the fence...
        let reward = redeem_code(false, Some(&c), t0()).unwrap();
        assert_eq!(reward, Amount::from_units(5.0));

        // ...so the re-validated second attempt observes it and fails, even
        // when both raced past their initial reads.
        assert!(matches!(
            redeem_code(true, Some(&c), t0()),
            Err(LedgerError::AlreadyRedeemed)
        ));
    }

    #[test]
    fn transfer_requires_kyc() {
        let mut acct = account();
        acct.kyc_status = KycStatus::Pending;
        assert!(matches!(
            prepare_transfer(&acct, Asset::Fair, Amount::from_units(50.0), &fees()),
            Err(LedgerError::KycRequired)
        ));
    }

    #[test]
    fn transfer_below_minimum_is_rejected() {
        assert!(matches!(
            prepare_transfer(&account(), Asset::Fair, Amount::from_units(49.99), &fees()),
            Err(LedgerError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn transfer_exceeding_balance_with_fee_is_rejected() {
        // 100.00 balance, 99.80 + 0.30 fee = 100.10 > 100.00.
        assert!(matches!(
            prepare_transfer(&account(), Asset::Fair, Amount::from_units(99.8), &fees()),
            Err(LedgerError::InsufficientBalance("Fair"))
        ));
    }

    #[test]
    fn transfer_plan_conserves_value() {
        // 100 Fair balance, send 50 with a 0.3 fee: sender ends at 49.70.
        let plan =
            prepare_transfer(&account(), Asset::Fair, Amount::from_units(50.0), &fees()).unwrap();
        assert_eq!(plan.amount, Amount::from_units(50.0));
        assert_eq!(plan.fee, Amount::from_units(0.3));
        assert_eq!(plan.total_debit, Amount::from_units(50.3));
        assert_eq!(
            plan.total_debit,
            plan.amount.checked_add(plan.fee).unwrap()
        );
        assert_eq!(
            account().verified_balance.checked_sub(plan.total_debit),
            Some(Amount::from_units(49.7))
        );
    }

    #[test]
    fn usdt_transfer_uses_its_own_schedule() {
        // No USDT fee and no minimum configured.
        let plan =
            prepare_transfer(&account(), Asset::Usdt, Amount::from_units(10.0), &fees()).unwrap();
        assert_eq!(plan.fee, Amount::ZERO);
        assert_eq!(plan.total_debit, Amount::from_units(10.0));
    }

    #[test]
    fn swap_below_minimum_is_rejected() {
        assert!(matches!(
            prepare_swap(&account(), Amount::from_units(99.99), &terms()),
            Err(LedgerError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn swap_over_balance_is_rejected() {
        assert!(matches!(
            prepare_swap(&account(), Amount::from_units(150.01), &terms()),
            Err(LedgerError::InsufficientBalance("FairX"))
        ));
    }

    #[test]
    fn swapping_the_full_balance_drains_it_exactly() {
        // 150 FairX at 0.1 becomes 15.00 Fair, leaving 0 FairX.
        let acct = account();
        let plan = prepare_swap(&acct, Amount::from_units(150.0), &terms()).unwrap();
        assert_eq!(plan.debit, acct.fairx_balance);
        assert_eq!(plan.credit, Amount::from_units(15.0));
        assert_eq!(acct.fairx_balance.checked_sub(plan.debit), Some(Amount::ZERO));
    }

    #[test]
    fn ad_bonus_requires_the_feature_flag() {
        assert!(matches!(
            ad_bonus(&schedule(), false),
            Err(LedgerError::AdsDisabled)
        ));
        assert_eq!(ad_bonus(&schedule(), true).unwrap(), Amount::from_units(0.5));

        let mut zero = schedule();
        zero.ad_bonus = Amount::ZERO;
        assert!(matches!(
            ad_bonus(&zero, true),
            Err(LedgerError::AdsDisabled)
        ));
    }

    #[test]
    fn successful_plans_never_drive_balances_negative() {
        let acct = account();
        let transfer =
            prepare_transfer(&acct, Asset::Fair, Amount::from_units(50.0), &fees()).unwrap();
        assert!(acct.verified_balance.checked_sub(transfer.total_debit).is_some());

        let swap = prepare_swap(&acct, Amount::from_units(100.0), &terms()).unwrap();
        assert!(acct.fairx_balance.checked_sub(swap.debit).is_some());
    }
}
