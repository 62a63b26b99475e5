use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::ledger::error::LedgerError;
use crate::models::account::{Account, KycStatus, ReferralRewards, Referrals};
use crate::models::amount::Amount;
use crate::models::notifications::{Notification, NotificationKind};

pub(crate) const SELECT_ACCOUNT: &str = "SELECT user_id, email, verified_balance, \
     unverified_balance, usdt_balance, fairx_balance, last_check_in, mining_started_at, \
     kyc_status, referrals_unverified, referrals_verified, ref_unverified_fair, \
     ref_unverified_usdt, ref_verified_fair, ref_verified_usdt FROM accounts";

/// Flat row shape of the `accounts` table; folded into the domain
/// [`Account`] so the catalog never sees column layout.
#[derive(sqlx::FromRow)]
pub(crate) struct AccountRow {
    pub user_id: String,
    pub email: String,
    pub verified_balance: Amount,
    pub unverified_balance: Amount,
    pub usdt_balance: Amount,
    pub fairx_balance: Amount,
    pub last_check_in: Option<DateTime<Utc>>,
    pub mining_started_at: Option<DateTime<Utc>>,
    pub kyc_status: String,
    pub referrals_unverified: i32,
    pub referrals_verified: i32,
    pub ref_unverified_fair: Amount,
    pub ref_unverified_usdt: Amount,
    pub ref_verified_fair: Amount,
    pub ref_verified_usdt: Amount,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Account {
        Account {
            user_id: row.user_id,
            email: row.email,
            verified_balance: row.verified_balance,
            unverified_balance: row.unverified_balance,
            usdt_balance: row.usdt_balance,
            fairx_balance: row.fairx_balance,
            last_check_in: row.last_check_in,
            mining_started_at: row.mining_started_at,
            kyc_status: KycStatus::from_db(&row.kyc_status),
            referrals: Referrals {
                unverified: row.referrals_unverified,
                verified: row.referrals_verified,
                unverified_rewards: ReferralRewards {
                    fair: row.ref_unverified_fair,
                    usdt: row.ref_unverified_usdt,
                },
                verified_rewards: ReferralRewards {
                    fair: row.ref_verified_fair,
                    usdt: row.ref_verified_usdt,
                },
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    kind: String,
    title: String,
    description: String,
    amount: Option<Amount>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Notification {
        Notification {
            id: row.id,
            kind: NotificationKind::from_db(&row.kind),
            title: row.title,
            description: row.description,
            amount: row.amount,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// Plain reads against the live pool, outside any transaction. These feed
/// the display read models only; no operation bases a precondition on them.
#[derive(Clone)]
pub struct AccountRepository {
    conn: PgPool,
}

impl AccountRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn get_account(&self, user_id: &str) -> Result<Account, LedgerError> {
        let sql = format!("{SELECT_ACCOUNT} WHERE user_id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.conn)
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        row.map(Account::from).ok_or(LedgerError::AccountNotFound)
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Notification>, LedgerError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, kind, title, description, amount, is_read, created_at \
             FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.conn)
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    pub async fn mark_notifications_read(&self, user_id: &str) -> Result<u64, LedgerError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.conn)
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
