use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::amount::Amount;

/// The two transferable balance units. FairX is convertible but not
/// transferable, so it is not an `Asset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Fair,
    Usdt,
}

impl Asset {
    pub fn as_db(self) -> &'static str {
        match self {
            Asset::Fair => "fair",
            Asset::Usdt => "usdt",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Asset::Fair => "Fair",
            Asset::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// KYC verification state. Only `Approved` permits outbound transfers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    pub fn is_approved(self) -> bool {
        self == KycStatus::Approved
    }

    pub fn from_db(value: &str) -> KycStatus {
        match value {
            "pending" => KycStatus::Pending,
            "approved" => KycStatus::Approved,
            "rejected" => KycStatus::Rejected,
            _ => KycStatus::None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ReferralRewards {
    pub fair: Amount,
    pub usdt: Amount,
}

/// Referral counters and per-status reward accumulators. Written at signup
/// and verification by collaborators outside this subsystem; the ledger only
/// reads them for display.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct Referrals {
    pub unverified: i32,
    pub verified: i32,
    pub unverified_rewards: ReferralRewards,
    pub verified_rewards: ReferralRewards,
}

/// The authoritative per-user ledger record. Created at signup, mutated only
/// through the ledger operations, never deleted here.
#[derive(Clone, Debug)]
pub struct Account {
    pub user_id: String,
    pub email: String,
    pub verified_balance: Amount,
    pub unverified_balance: Amount,
    pub usdt_balance: Amount,
    pub fairx_balance: Amount,
    pub last_check_in: Option<DateTime<Utc>>,
    pub mining_started_at: Option<DateTime<Utc>>,
    pub kyc_status: KycStatus,
    pub referrals: Referrals,
}

impl Account {
    pub fn balance(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Fair => self.verified_balance,
            Asset::Usdt => self.usdt_balance,
        }
    }
}
