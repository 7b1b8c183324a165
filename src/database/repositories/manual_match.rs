//! Manual match repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::manual_match::{ManualMatch, ManualMatchStatus, CreateManualMatchRequest};
use crate::utils::errors::{HelpChainError, Result};

#[derive(Clone, Debug)]
pub struct ManualMatchRepository {
    pool: PgPool,
}

impl ManualMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new manual match
    pub async fn insert(&self, conn: &mut PgConnection, request: CreateManualMatchRequest, now: DateTime<Utc>) -> Result<ManualMatch> {
        let (user_id, role) = (request.user_id, request.role);
        let manual_match = sqlx::query_as::<_, ManualMatch>(
            r#"
            INSERT INTO manual_matches
                (user_id, role, amount, matched_with_name, matched_with_email, matched_with_phone,
                 payment_account, payment_method, status, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', $9, $10)
            RETURNING id, user_id, role, amount, matched_with_name, matched_with_email, matched_with_phone,
                      payment_account, payment_method, status, created_by, created_at, completed_at
            "#
        )
        .bind(request.user_id)
        .bind(request.role)
        .bind(request.amount)
        .bind(request.counterparty.name)
        .bind(request.counterparty.email)
        .bind(request.counterparty.phone)
        .bind(request.counterparty.payment_account)
        .bind(request.counterparty.payment_method)
        .bind(request.created_by)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| HelpChainError::conflict_on_unique(e, format!("user {} already has an active {} manual match", user_id, role)))?;

        Ok(manual_match)
    }

    /// Active manual matches held by any of the given users
    pub async fn list_active_for_users(&self, conn: &mut PgConnection, user_ids: &[i64]) -> Result<Vec<ManualMatch>> {
        let matches = sqlx::query_as::<_, ManualMatch>(
            r#"
            SELECT id, user_id, role, amount, matched_with_name, matched_with_email, matched_with_phone,
                   payment_account, payment_method, status, created_by, created_at, completed_at
            FROM manual_matches
            WHERE status = 'active' AND user_id = ANY($1)
            ORDER BY user_id, id
            "#
        )
        .bind(user_ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(matches)
    }

    /// Find manual match by ID and lock it
    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i64) -> Result<Option<ManualMatch>> {
        let manual_match = sqlx::query_as::<_, ManualMatch>(
            r#"
            SELECT id, user_id, role, amount, matched_with_name, matched_with_email, matched_with_phone,
                   payment_account, payment_method, status, created_by, created_at, completed_at
            FROM manual_matches WHERE id = $1
            FOR UPDATE
            "#
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(manual_match)
    }

    /// Close an active manual match
    pub async fn mark_completed(&self, conn: &mut PgConnection, id: i64, at: DateTime<Utc>) -> Result<ManualMatch> {
        let manual_match = sqlx::query_as::<_, ManualMatch>(
            r#"
            UPDATE manual_matches
            SET status = 'completed', completed_at = $2
            WHERE id = $1
            RETURNING id, user_id, role, amount, matched_with_name, matched_with_email, matched_with_phone,
                      payment_account, payment_method, status, created_by, created_at, completed_at
            "#
        )
        .bind(id)
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(manual_match)
    }

    /// List manual matches, optionally filtered by status, newest first
    pub async fn list(&self, status: Option<ManualMatchStatus>) -> Result<Vec<ManualMatch>> {
        let matches = sqlx::query_as::<_, ManualMatch>(
            r#"
            SELECT id, user_id, role, amount, matched_with_name, matched_with_email, matched_with_phone,
                   payment_account, payment_method, status, created_by, created_at, completed_at
            FROM manual_matches
            WHERE $1::manual_match_status IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            "#
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    /// Active manual matches of a user
    pub async fn list_active_for_user(&self, user_id: i64) -> Result<Vec<ManualMatch>> {
        let matches = sqlx::query_as::<_, ManualMatch>(
            r#"
            SELECT id, user_id, role, amount, matched_with_name, matched_with_email, matched_with_phone,
                   payment_account, payment_method, status, created_by, created_at, completed_at
            FROM manual_matches
            WHERE user_id = $1 AND status = 'active'
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }
}
