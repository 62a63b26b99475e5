use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service};
use crate::ledger::error::LedgerError;
use crate::ledger::read::{self, MiningState};
use crate::models::account::{Account, KycStatus, Referrals};
use crate::models::amount::Amount;
use crate::models::notifications::Notification;
use crate::repositories::accounts::AccountRepository;

/// Display snapshot of a wallet. Amounts are integer cents; timers are
/// derived from the stored timestamps and the clock at assembly time, so
/// they are presentation hints only. Eligibility is re-decided inside the
/// operation transaction.
#[derive(Serialize)]
pub struct WalletOverview {
    pub user_id: String,
    pub email: String,
    pub total_balance: Amount,
    pub verified_balance: Amount,
    pub unverified_balance: Amount,
    pub usdt_balance: Amount,
    pub fairx_balance: Amount,
    pub kyc_status: KycStatus,
    pub referrals: Referrals,
    pub check_in_ready: bool,
    pub check_in_remaining_secs: i64,
    pub mining: MiningStatus,
}

#[derive(Serialize)]
pub struct MiningStatus {
    pub state: &'static str,
    pub remaining_secs: i64,
}

impl WalletOverview {
    fn from_account(account: Account) -> Self {
        let now = Utc::now();
        let check_in_remaining = read::check_in_remaining(account.last_check_in, now);
        let mining = match read::mining_state(account.mining_started_at, now) {
            MiningState::Idle => MiningStatus {
                state: "idle",
                remaining_secs: 0,
            },
            MiningState::Running { remaining } => MiningStatus {
                state: "running",
                remaining_secs: remaining.num_seconds(),
            },
            MiningState::Claimable => MiningStatus {
                state: "claimable",
                remaining_secs: 0,
            },
        };

        WalletOverview {
            total_balance: read::total_balance(&account),
            user_id: account.user_id,
            email: account.email,
            verified_balance: account.verified_balance,
            unverified_balance: account.unverified_balance,
            usdt_balance: account.usdt_balance,
            fairx_balance: account.fairx_balance,
            kyc_status: account.kyc_status,
            referrals: account.referrals,
            check_in_ready: check_in_remaining.is_zero(),
            check_in_remaining_secs: check_in_remaining.num_seconds(),
            mining,
        }
    }
}

pub enum WalletRequest {
    GetOverview {
        user_id: String,
        response: oneshot::Sender<Result<WalletOverview, LedgerError>>,
    },
    GetActivity {
        user_id: String,
        limit: i64,
        response: oneshot::Sender<Result<Vec<Notification>, LedgerError>>,
    },
    MarkActivityRead {
        user_id: String,
        response: oneshot::Sender<Result<u64, LedgerError>>,
    },
}

#[derive(Clone)]
pub struct WalletRequestHandler {
    repository: AccountRepository,
}

impl WalletRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        WalletRequestHandler {
            repository: AccountRepository::new(sql_conn),
        }
    }

    async fn get_overview(&self, user_id: &str) -> Result<WalletOverview, LedgerError> {
        let account = self.repository.get_account(user_id).await?;
        Ok(WalletOverview::from_account(account))
    }
}

#[async_trait]
impl RequestHandler<WalletRequest> for WalletRequestHandler {
    async fn handle_request(&self, request: WalletRequest) {
        match request {
            WalletRequest::GetOverview { user_id, response } => {
                let result = self.get_overview(&user_id).await;
                let _ = response.send(result);
            }
            WalletRequest::GetActivity {
                user_id,
                limit,
                response,
            } => {
                let result = self.repository.list_notifications(&user_id, limit).await;
                let _ = response.send(result);
            }
            WalletRequest::MarkActivityRead { user_id, response } => {
                let result = self.repository.mark_notifications_read(&user_id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct WalletService;

impl WalletService {
    pub fn new() -> Self {
        WalletService {}
    }
}

#[async_trait]
impl Service<WalletRequest, WalletRequestHandler> for WalletService {}
