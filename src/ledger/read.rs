//! Derived, non-authoritative read models: display balances and countdown
//! timers. Pure functions of stored timestamps and the current time, never
//! cached. The authoritative eligibility checks live in the catalog and run
//! against the server clock inside the transaction; these only drive UI.

use chrono::{DateTime, Duration, Utc};

use super::catalog::{CHECK_IN_COOLDOWN_HOURS, MINING_DURATION_HOURS};
use crate::models::account::Account;
use crate::models::amount::Amount;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MiningState {
    Idle,
    Running { remaining: Duration },
    Claimable,
}

/// Verified plus unverified Fair, the headline wallet figure.
pub fn total_balance(account: &Account) -> Amount {
    account
        .verified_balance
        .saturating_add(account.unverified_balance)
}

/// Time until the next check-in becomes available; zero when eligible now.
pub fn check_in_remaining(last_check_in: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    match last_check_in {
        None => Duration::zero(),
        Some(last) => {
            let next = last + Duration::hours(CHECK_IN_COOLDOWN_HOURS);
            if now >= next {
                Duration::zero()
            } else {
                next - now
            }
        }
    }
}

pub fn mining_state(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> MiningState {
    match started_at {
        None => MiningState::Idle,
        Some(started) => {
            let done = started + Duration::hours(MINING_DURATION_HOURS);
            if now >= done {
                MiningState::Claimable
            } else {
                MiningState::Running {
                    remaining: done - now,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::{KycStatus, Referrals};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn total_balance_sums_both_fair_pools() {
        let account = Account {
            user_id: "u".into(),
            email: "u@example.com".into(),
            verified_balance: Amount::from_units(3.5),
            unverified_balance: Amount::from_units(1.25),
            usdt_balance: Amount::ZERO,
            fairx_balance: Amount::ZERO,
            last_check_in: None,
            mining_started_at: None,
            kyc_status: KycStatus::None,
            referrals: Referrals::default(),
        };
        assert_eq!(total_balance(&account), Amount::from_units(4.75));
    }

    #[test]
    fn check_in_timer_clamps_at_zero() {
        assert_eq!(check_in_remaining(None, t0()), Duration::zero());
        assert_eq!(
            check_in_remaining(Some(t0() - Duration::hours(30)), t0()),
            Duration::zero()
        );
        assert_eq!(
            check_in_remaining(Some(t0() - Duration::hours(20)), t0()),
            Duration::hours(4)
        );
    }

    #[test]
    fn mining_state_walks_idle_running_claimable() {
        assert_eq!(mining_state(None, t0()), MiningState::Idle);
        assert_eq!(
            mining_state(Some(t0() - Duration::hours(10)), t0()),
            MiningState::Running {
                remaining: Duration::hours(14)
            }
        );
        assert_eq!(
            mining_state(Some(t0() - Duration::hours(24)), t0()),
            MiningState::Claimable
        );
    }
}
