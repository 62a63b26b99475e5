use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service};
use crate::ledger::catalog::{FeeSchedule, RewardSchedule, SwapPlan, SwapTerms, TransferPlan};
use crate::ledger::error::LedgerError;
use crate::models::account::Asset;
use crate::models::amount::Amount;
use crate::repositories::ledger::LedgerRepository;
use crate::settings::Settings;

/// How long the simulated rewarded ad plays before the bonus is credited.
/// Bounded, and independent of the base reward, which has already committed.
const AD_PLAYBACK_SECS: u64 = 5;

pub enum LedgerRequest {
    CheckIn {
        user_id: String,
        response: oneshot::Sender<Result<Amount, LedgerError>>,
    },
    StartMining {
        user_id: String,
        response: oneshot::Sender<Result<DateTime<Utc>, LedgerError>>,
    },
    ClaimMining {
        user_id: String,
        response: oneshot::Sender<Result<Amount, LedgerError>>,
    },
    RedeemCode {
        user_id: String,
        code: String,
        response: oneshot::Sender<Result<Amount, LedgerError>>,
    },
    Send {
        sender_id: String,
        recipient_email: String,
        asset: Asset,
        amount: Amount,
        response: oneshot::Sender<Result<TransferPlan, LedgerError>>,
    },
    Swap {
        user_id: String,
        amount: Amount,
        response: oneshot::Sender<Result<SwapPlan, LedgerError>>,
    },
    AdBonus {
        user_id: String,
        context: String,
        response: oneshot::Sender<Result<Amount, LedgerError>>,
    },
}

#[derive(Clone)]
pub struct LedgerRequestHandler {
    repository: LedgerRepository,
    rewards: RewardSchedule,
    fees: FeeSchedule,
    swap: SwapTerms,
    ads_enabled: bool,
}

impl LedgerRequestHandler {
    pub fn new(sql_conn: PgPool, settings: &Settings) -> Self {
        LedgerRequestHandler {
            repository: LedgerRepository::new(sql_conn),
            rewards: settings.reward_schedule(),
            fees: settings.fee_schedule(),
            swap: settings.swap_terms(),
            ads_enabled: settings.features.ads_enabled,
        }
    }

    async fn ad_bonus(&self, user_id: &str, context: &str) -> Result<Amount, LedgerError> {
        if !self.ads_enabled {
            return Err(LedgerError::AdsDisabled);
        }

        // Simulated ad playback. The flag and schedule are re-checked inside
        // the crediting transaction afterwards.
        tokio::time::sleep(std::time::Duration::from_secs(AD_PLAYBACK_SECS)).await;

        self.repository
            .ad_bonus(user_id, context, &self.rewards, self.ads_enabled)
            .await
    }
}

#[async_trait]
impl RequestHandler<LedgerRequest> for LedgerRequestHandler {
    async fn handle_request(&self, request: LedgerRequest) {
        match request {
            LedgerRequest::CheckIn { user_id, response } => {
                let result = self
                    .repository
                    .daily_check_in(&user_id, &self.rewards)
                    .await;
                let _ = response.send(result);
            }
            LedgerRequest::StartMining { user_id, response } => {
                let result = self.repository.start_mining(&user_id).await;
                let _ = response.send(result);
            }
            LedgerRequest::ClaimMining { user_id, response } => {
                let result = self.repository.claim_mining(&user_id, &self.rewards).await;
                let _ = response.send(result);
            }
            LedgerRequest::RedeemCode {
                user_id,
                code,
                response,
            } => {
                let result = self.repository.redeem_code(&user_id, &code).await;
                let _ = response.send(result);
            }
            LedgerRequest::Send {
                sender_id,
                recipient_email,
                asset,
                amount,
                response,
            } => {
                let result = self
                    .repository
                    .send(&sender_id, &recipient_email, asset, amount, &self.fees)
                    .await;
                let _ = response.send(result);
            }
            LedgerRequest::Swap {
                user_id,
                amount,
                response,
            } => {
                let result = self.repository.swap(&user_id, amount, &self.swap).await;
                let _ = response.send(result);
            }
            LedgerRequest::AdBonus {
                user_id,
                context,
                response,
            } => {
                let result = self.ad_bonus(&user_id, &context).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        LedgerService {}
    }
}

#[async_trait]
impl Service<LedgerRequest, LedgerRequestHandler> for LedgerService {}
