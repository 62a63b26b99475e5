//! Transactional execution of the ledger transition catalog.
//!
//! Each operation runs as one SERIALIZABLE Postgres transaction: snapshot
//! reads, catalog validation, writes and the audit notification either all
//! commit or none do. Serialization failures surface as
//! [`LedgerError::Conflict`] and the whole validate-and-write unit is
//! re-run against a fresh snapshot, up to a bounded number of attempts.
//! "Now" is always the database clock read inside the transaction, never a
//! caller-supplied time.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::accounts::{AccountRow, SELECT_ACCOUNT};
use crate::ledger::catalog::{self, FeeSchedule, RewardSchedule, SwapPlan, SwapTerms, TransferPlan};
use crate::ledger::error::LedgerError;
use crate::models::account::{Account, Asset};
use crate::models::amount::Amount;
use crate::models::codes::{self, RedemptionCode};
use crate::models::notifications::NotificationKind;

const MAX_TX_ATTEMPTS: u32 = 5;

/// Maps store failures onto the ledger taxonomy. Serialization conflicts
/// become retryable; a duplicate key can only come from the redemption
/// fence, the one unique key this repository inserts under contention.
fn map_store_err(e: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some("40001") | Some("40P01") => return LedgerError::Conflict,
            Some("23505") => return LedgerError::AlreadyRedeemed,
            _ => {}
        }
    }
    LedgerError::Store(e.to_string())
}

#[derive(Clone)]
pub struct LedgerRepository {
    conn: PgPool,
}

impl LedgerRepository {
    pub fn new(conn: PgPool) -> Self {
        LedgerRepository { conn }
    }

    /// Re-runs a whole transaction on serialization conflict. Precondition
    /// failures are returned as-is; retrying them cannot change the outcome.
    async fn with_retry<T, F, Fut>(&self, op: &str, run: F) -> Result<T, LedgerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        for attempt in 1..=MAX_TX_ATTEMPTS {
            match run().await {
                Err(LedgerError::Conflict) if attempt < MAX_TX_ATTEMPTS => {
                    log::warn!(
                        "{op}: transaction conflict, retrying (attempt {attempt}/{MAX_TX_ATTEMPTS})"
                    );
                }
                other => return other,
            }
        }
        Err(LedgerError::Conflict)
    }

    async fn begin_serializable(&self) -> Result<Transaction<'static, Postgres>, LedgerError> {
        let mut tx = self.conn.begin().await.map_err(map_store_err)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_store_err)?;
        Ok(tx)
    }

    /// The server-assigned clock, read inside the transaction. Everything
    /// that gates future eligibility compares against this, so client clock
    /// skew cannot buy an early claim.
    async fn server_now(tx: &mut Transaction<'_, Postgres>) -> Result<DateTime<Utc>, LedgerError> {
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT now()")
            .fetch_one(&mut **tx)
            .await
            .map_err(map_store_err)?;
        Ok(now)
    }

    async fn fetch_account(
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
    ) -> Result<Account, LedgerError> {
        let sql = format!("{SELECT_ACCOUNT} WHERE user_id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_store_err)?;

        row.map(Account::from).ok_or(LedgerError::AccountNotFound)
    }

    async fn insert_notification(
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        description: &str,
        amount: Option<Amount>,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, description, amount) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(user_id)
        .bind(kind.as_db())
        .bind(title)
        .bind(description)
        .bind(amount)
        .execute(&mut **tx)
        .await
        .map_err(map_store_err)?;

        Ok(())
    }

    pub async fn daily_check_in(
        &self,
        user_id: &str,
        schedule: &RewardSchedule,
    ) -> Result<Amount, LedgerError> {
        self.with_retry("daily_check_in", || {
            self.try_daily_check_in(user_id, schedule)
        })
        .await
    }

    async fn try_daily_check_in(
        &self,
        user_id: &str,
        schedule: &RewardSchedule,
    ) -> Result<Amount, LedgerError> {
        let mut tx = self.begin_serializable().await?;
        let now = Self::server_now(&mut tx).await?;
        let account = Self::fetch_account(&mut tx, user_id).await?;

        let reward = catalog::daily_check_in(&account, schedule, now)?;

        sqlx::query(
            "UPDATE accounts SET verified_balance = verified_balance + $1, \
             last_check_in = $2, updated_at = now() WHERE user_id = $3",
        )
        .bind(reward)
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_store_err)?;

        Self::insert_notification(
            &mut tx,
            user_id,
            NotificationKind::Reward,
            "Daily Check-in",
            &format!("You earned +{reward} Fair for your daily check-in."),
            Some(reward),
        )
        .await?;

        tx.commit().await.map_err(map_store_err)?;
        log::info!("daily_check_in: credited {reward} Fair to {user_id}");
        Ok(reward)
    }

    pub async fn start_mining(&self, user_id: &str) -> Result<DateTime<Utc>, LedgerError> {
        self.with_retry("start_mining", || self.try_start_mining(user_id))
            .await
    }

    async fn try_start_mining(&self, user_id: &str) -> Result<DateTime<Utc>, LedgerError> {
        let mut tx = self.begin_serializable().await?;
        let now = Self::server_now(&mut tx).await?;
        let account = Self::fetch_account(&mut tx, user_id).await?;

        catalog::start_mining(&account)?;

        sqlx::query(
            "UPDATE accounts SET mining_started_at = $1, updated_at = now() WHERE user_id = $2",
        )
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_store_err)?;

        tx.commit().await.map_err(map_store_err)?;
        Ok(now)
    }

    pub async fn claim_mining(
        &self,
        user_id: &str,
        schedule: &RewardSchedule,
    ) -> Result<Amount, LedgerError> {
        self.with_retry("claim_mining", || self.try_claim_mining(user_id, schedule))
            .await
    }

    async fn try_claim_mining(
        &self,
        user_id: &str,
        schedule: &RewardSchedule,
    ) -> Result<Amount, LedgerError> {
        let mut tx = self.begin_serializable().await?;
        let now = Self::server_now(&mut tx).await?;
        let account = Self::fetch_account(&mut tx, user_id).await?;

        let reward = catalog::claim_mining(&account, schedule, now)?;

        sqlx::query(
            "UPDATE accounts SET verified_balance = verified_balance + $1, \
             mining_started_at = NULL, updated_at = now() WHERE user_id = $2",
        )
        .bind(reward)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_store_err)?;

        Self::insert_notification(
            &mut tx,
            user_id,
            NotificationKind::Reward,
            "Mining Reward Claimed",
            &format!("You earned +{reward} Fair from your mining session."),
            Some(reward),
        )
        .await?;

        tx.commit().await.map_err(map_store_err)?;
        log::info!("claim_mining: credited {reward} Fair to {user_id}");
        Ok(reward)
    }

    pub async fn redeem_code(&self, user_id: &str, raw_code: &str) -> Result<Amount, LedgerError> {
        let code = codes::normalize_code(raw_code);
        if code.is_empty() {
            return Err(LedgerError::InvalidCode);
        }
        self.with_retry("redeem_code", || self.try_redeem_code(user_id, &code))
            .await
    }

    async fn try_redeem_code(&self, user_id: &str, code: &str) -> Result<Amount, LedgerError> {
        let mut tx = self.begin_serializable().await?;
        let now = Self::server_now(&mut tx).await?;
        // The account must exist before we fence on it.
        let _ = Self::fetch_account(&mut tx, user_id).await?;

        let already_redeemed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM redeemed_codes WHERE user_id = $1 AND code = $2)",
        )
        .bind(user_id)
        .bind(code)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_store_err)?;

        let definition = sqlx::query_as::<_, RedemptionCode>(
            "SELECT code, reward_amount, valid_until FROM redemption_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_store_err)?;

        let reward = catalog::redeem_code(already_redeemed, definition.as_ref(), now)?;

        // The fence write and the credit are one atomic unit with the check
        // above; of two concurrent attempts at most one commits, the other
        // re-runs and observes the marker (or trips the unique key).
        sqlx::query("INSERT INTO redeemed_codes (user_id, code) VALUES ($1, $2)")
            .bind(user_id)
            .bind(code)
            .execute(&mut *tx)
            .await
            .map_err(map_store_err)?;

        sqlx::query(
            "UPDATE accounts SET verified_balance = verified_balance + $1, \
             updated_at = now() WHERE user_id = $2",
        )
        .bind(reward)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_store_err)?;

        Self::insert_notification(
            &mut tx,
            user_id,
            NotificationKind::Reward,
            "Daily Code Redeemed",
            &format!("You received +{reward} Fair from code: {code}."),
            Some(reward),
        )
        .await?;

        tx.commit().await.map_err(map_store_err)?;
        log::info!("redeem_code: credited {reward} Fair to {user_id} for code {code}");
        Ok(reward)
    }

    pub async fn send(
        &self,
        sender_id: &str,
        recipient_email: &str,
        asset: Asset,
        amount: Amount,
        fees: &FeeSchedule,
    ) -> Result<TransferPlan, LedgerError> {
        let email = recipient_email.trim().to_lowercase();
        self.with_retry("send", || {
            self.try_send(sender_id, &email, asset, amount, fees)
        })
        .await
    }

    async fn try_send(
        &self,
        sender_id: &str,
        recipient_email: &str,
        asset: Asset,
        amount: Amount,
        fees: &FeeSchedule,
    ) -> Result<TransferPlan, LedgerError> {
        let mut tx = self.begin_serializable().await?;
        let sender = Self::fetch_account(&mut tx, sender_id).await?;

        let sql = format!("{SELECT_ACCOUNT} WHERE email = $1");
        let recipient = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(recipient_email)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_store_err)?
            .map(Account::from)
            .ok_or(LedgerError::RecipientNotFound)?;

        if recipient.user_id == sender.user_id {
            return Err(LedgerError::SelfTransfer);
        }

        let plan = catalog::prepare_transfer(&sender, asset, amount, fees)?;

        let column = match asset {
            Asset::Fair => "verified_balance",
            Asset::Usdt => "usdt_balance",
        };

        let debit_sql =
            format!("UPDATE accounts SET {column} = {column} - $1, updated_at = now() WHERE user_id = $2");
        sqlx::query(&debit_sql)
            .bind(plan.total_debit)
            .bind(sender_id)
            .execute(&mut *tx)
            .await
            .map_err(map_store_err)?;

        let credit_sql =
            format!("UPDATE accounts SET {column} = {column} + $1, updated_at = now() WHERE user_id = $2");
        sqlx::query(&credit_sql)
            .bind(plan.amount)
            .bind(&recipient.user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_store_err)?;

        if plan.fee.is_positive() {
            sqlx::query(
                "INSERT INTO platform_wallet (asset, balance) VALUES ($1, $2) \
                 ON CONFLICT (asset) DO UPDATE SET balance = platform_wallet.balance + EXCLUDED.balance",
            )
            .bind(asset.as_db())
            .bind(plan.fee)
            .execute(&mut *tx)
            .await
            .map_err(map_store_err)?;
        }

        Self::insert_notification(
            &mut tx,
            sender_id,
            NotificationKind::Send,
            &format!("Sent {asset}"),
            &format!("You sent {amount} {asset} to {recipient_email}."),
            Some(-plan.amount),
        )
        .await?;

        Self::insert_notification(
            &mut tx,
            &recipient.user_id,
            NotificationKind::Receive,
            &format!("Received {asset}"),
            &format!("You received {amount} {asset} from {}.", sender.email),
            Some(plan.amount),
        )
        .await?;

        tx.commit().await.map_err(map_store_err)?;
        log::info!(
            "send: {sender_id} sent {amount} {asset} to {} (fee {})",
            recipient.user_id,
            plan.fee
        );
        Ok(plan)
    }

    pub async fn swap(
        &self,
        user_id: &str,
        amount: Amount,
        terms: &SwapTerms,
    ) -> Result<SwapPlan, LedgerError> {
        self.with_retry("swap", || self.try_swap(user_id, amount, terms))
            .await
    }

    async fn try_swap(
        &self,
        user_id: &str,
        amount: Amount,
        terms: &SwapTerms,
    ) -> Result<SwapPlan, LedgerError> {
        let mut tx = self.begin_serializable().await?;
        let account = Self::fetch_account(&mut tx, user_id).await?;

        let plan = catalog::prepare_swap(&account, amount, terms)?;

        sqlx::query(
            "UPDATE accounts SET fairx_balance = fairx_balance - $1, \
             unverified_balance = unverified_balance + $2, updated_at = now() \
             WHERE user_id = $3",
        )
        .bind(plan.debit)
        .bind(plan.credit)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_store_err)?;

        Self::insert_notification(
            &mut tx,
            user_id,
            NotificationKind::Reward,
            "Points Swapped",
            &format!("You swapped {} FairX for {} Fair.", plan.debit, plan.credit),
            Some(plan.credit),
        )
        .await?;

        tx.commit().await.map_err(map_store_err)?;
        log::info!(
            "swap: {user_id} converted {} FairX into {} Fair",
            plan.debit,
            plan.credit
        );
        Ok(plan)
    }

    pub async fn ad_bonus(
        &self,
        user_id: &str,
        context: &str,
        schedule: &RewardSchedule,
        ads_enabled: bool,
    ) -> Result<Amount, LedgerError> {
        self.with_retry("ad_bonus", || {
            self.try_ad_bonus(user_id, context, schedule, ads_enabled)
        })
        .await
    }

    async fn try_ad_bonus(
        &self,
        user_id: &str,
        context: &str,
        schedule: &RewardSchedule,
        ads_enabled: bool,
    ) -> Result<Amount, LedgerError> {
        let mut tx = self.begin_serializable().await?;
        let _ = Self::fetch_account(&mut tx, user_id).await?;

        let bonus = catalog::ad_bonus(schedule, ads_enabled)?;

        sqlx::query(
            "UPDATE accounts SET verified_balance = verified_balance + $1, \
             updated_at = now() WHERE user_id = $2",
        )
        .bind(bonus)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_store_err)?;

        Self::insert_notification(
            &mut tx,
            user_id,
            NotificationKind::Reward,
            &format!("{context} (Ad Bonus)"),
            &format!("You earned +{bonus} Fair with an ad bonus!"),
            Some(bonus),
        )
        .await?;

        tx.commit().await.map_err(map_store_err)?;
        log::info!("ad_bonus: credited {bonus} Fair to {user_id}");
        Ok(bonus)
    }
}
