//! Ban ledger model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BannedAccount {
    pub id: i64,
    pub user_id: i64,
    pub reason: String,
    pub banned_by: i64,
    pub banned_at: DateTime<Utc>,
    pub unbanned_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBanRequest {
    pub user_id: i64,
    pub reason: String,
    pub banned_by: i64,
}

/// Emitted after a ban ledger change commits; the access-control
/// collaborator revokes or restores the account in response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BanEvent {
    Banned {
        ban_id: i64,
        user_id: i64,
        reason: String,
        banned_by: i64,
        at: DateTime<Utc>,
    },
    Unbanned {
        ban_id: i64,
        user_id: i64,
        unbanned_by: i64,
        at: DateTime<Utc>,
    },
}

impl BanEvent {
    pub fn user_id(&self) -> i64 {
        match self {
            BanEvent::Banned { user_id, .. } | BanEvent::Unbanned { user_id, .. } => *user_id,
        }
    }
}
