use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::amount::Amount;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reward,
    Send,
    Receive,
}

impl NotificationKind {
    pub fn as_db(self) -> &'static str {
        match self {
            NotificationKind::Reward => "reward",
            NotificationKind::Send => "send",
            NotificationKind::Receive => "receive",
        }
    }

    pub fn from_db(value: &str) -> NotificationKind {
        match value {
            "send" => NotificationKind::Send,
            "receive" => NotificationKind::Receive,
            _ => NotificationKind::Reward,
        }
    }
}

/// Append-only audit entry written as a side effect of every
/// balance-changing operation. Never mutates balances itself.
#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    /// Signed, in cents; the unit is implied by the notification context.
    pub amount: Option<Amount>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
