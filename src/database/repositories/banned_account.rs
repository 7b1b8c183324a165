//! Ban ledger repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::banned_account::{BannedAccount, CreateBanRequest};
use crate::utils::errors::{HelpChainError, Result};

#[derive(Clone, Debug)]
pub struct BannedAccountRepository {
    pool: PgPool,
}

impl BannedAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an active ban
    pub async fn insert(&self, conn: &mut PgConnection, request: CreateBanRequest, now: DateTime<Utc>) -> Result<BannedAccount> {
        let user_id = request.user_id;
        sqlx::query_as::<_, BannedAccount>(
            r#"
            INSERT INTO banned_accounts (user_id, reason, banned_by, banned_at, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id, user_id, reason, banned_by, banned_at, unbanned_at, is_active
            "#
        )
        .bind(request.user_id)
        .bind(request.reason)
        .bind(request.banned_by)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| HelpChainError::conflict_on_unique(e, format!("user {} is already banned", user_id)))
    }

    pub async fn find_active_for_user(&self, conn: &mut PgConnection, user_id: i64) -> Result<Option<BannedAccount>> {
        let ban = sqlx::query_as::<_, BannedAccount>(
            "SELECT id, user_id, reason, banned_by, banned_at, unbanned_at, is_active FROM banned_accounts WHERE user_id = $1 AND is_active"
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(ban)
    }

    pub async fn is_banned(&self, user_id: i64) -> Result<bool> {
        let banned: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM banned_accounts WHERE user_id = $1 AND is_active)"
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(banned.0)
    }

    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i64) -> Result<Option<BannedAccount>> {
        let ban = sqlx::query_as::<_, BannedAccount>(
            "SELECT id, user_id, reason, banned_by, banned_at, unbanned_at, is_active FROM banned_accounts WHERE id = $1 FOR UPDATE"
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(ban)
    }

    /// Lift a ban; the row stays as history
    pub async fn deactivate(&self, conn: &mut PgConnection, id: i64, now: DateTime<Utc>) -> Result<BannedAccount> {
        let ban = sqlx::query_as::<_, BannedAccount>(
            r#"
            UPDATE banned_accounts
            SET is_active = FALSE, unbanned_at = $2
            WHERE id = $1
            RETURNING id, user_id, reason, banned_by, banned_at, unbanned_at, is_active
            "#
        )
        .bind(id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(ban)
    }

    /// Ban ledger, newest first
    pub async fn list(&self, active_only: bool) -> Result<Vec<BannedAccount>> {
        let bans = sqlx::query_as::<_, BannedAccount>(
            r#"
            SELECT id, user_id, reason, banned_by, banned_at, unbanned_at, is_active
            FROM banned_accounts
            WHERE is_active OR NOT $1
            ORDER BY banned_at DESC, id DESC
            "#
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(bans)
    }

    pub async fn count_active(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM banned_accounts WHERE is_active")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
