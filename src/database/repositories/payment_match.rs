//! Payment match repository implementation

use sqlx::{PgConnection, PgExecutor, PgPool};
use chrono::{DateTime, Utc};
use crate::models::payment_match::{PaymentMatch, CreatePaymentMatchRequest};
use crate::utils::errors::{HelpChainError, Result};

#[derive(Clone, Debug)]
pub struct PaymentMatchRepository {
    pool: PgPool,
}

impl PaymentMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new pending match.
    ///
    /// The one-live-match indexes on giver and receiver turn a racing insert into a `Conflict`.
    pub async fn insert(&self, conn: &mut PgConnection, request: CreatePaymentMatchRequest) -> Result<PaymentMatch> {
        sqlx::query_as::<_, PaymentMatch>(
            r#"
            INSERT INTO payment_matches
                (giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                 status, matched_by_operator, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            RETURNING id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                      status, matched_by_operator, created_at, sent_at, completed_at
            "#
        )
        .bind(request.giver_id)
        .bind(request.receiver_id)
        .bind(request.help_activity_id)
        .bind(request.counterpart_activity_id)
        .bind(request.amount)
        .bind(request.payment_deadline)
        .bind(request.matched_by.operator_id())
        .bind(request.created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| HelpChainError::conflict_on_unique(e, "a party was matched concurrently"))
    }

    /// Find match by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<PaymentMatch>> {
        let payment_match = sqlx::query_as::<_, PaymentMatch>(
            r#"
            SELECT id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                   status, matched_by_operator, created_at, sent_at, completed_at
            FROM payment_matches WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment_match)
    }

    /// Find match by ID and hold its row lock until the transaction ends
    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i64) -> Result<Option<PaymentMatch>> {
        let payment_match = sqlx::query_as::<_, PaymentMatch>(
            r#"
            SELECT id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                   status, matched_by_operator, created_at, sent_at, completed_at
            FROM payment_matches WHERE id = $1
            FOR UPDATE
            "#
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(payment_match)
    }

    /// The live match a user takes part in, on either side
    pub async fn find_live_for_user<'e, E>(&self, executor: E, user_id: i64) -> Result<Option<PaymentMatch>>
    where
        E: PgExecutor<'e>,
    {
        let payment_match = sqlx::query_as::<_, PaymentMatch>(
            r#"
            SELECT id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                   status, matched_by_operator, created_at, sent_at, completed_at
            FROM payment_matches
            WHERE status <> 'completed' AND (giver_id = $1 OR receiver_id = $1)
            ORDER BY created_at DESC
            LIMIT 1
            "#
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(payment_match)
    }

    /// Which of the given users hold a live match
    pub async fn live_participants(&self, conn: &mut PgConnection, user_ids: &[i64]) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT giver_id FROM payment_matches WHERE status <> 'completed' AND giver_id = ANY($1)
            UNION
            SELECT receiver_id FROM payment_matches WHERE status <> 'completed' AND receiver_id = ANY($1)
            "#
        )
        .bind(user_ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Count live matches referencing an activity from either side
    pub async fn count_live_for_activity(&self, conn: &mut PgConnection, activity_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM payment_matches
            WHERE status <> 'completed' AND (help_activity_id = $1 OR counterpart_activity_id = $1)
            "#
        )
        .bind(activity_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count.0)
    }

    /// Giver reported the payment as sent
    pub async fn mark_sent(&self, conn: &mut PgConnection, id: i64, at: DateTime<Utc>) -> Result<PaymentMatch> {
        let payment_match = sqlx::query_as::<_, PaymentMatch>(
            r#"
            UPDATE payment_matches
            SET status = 'awaiting_confirmation', sent_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                      status, matched_by_operator, created_at, sent_at, completed_at
            "#
        )
        .bind(id)
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(payment_match)
    }

    /// Payment verified as received
    pub async fn mark_completed(&self, conn: &mut PgConnection, id: i64, at: DateTime<Utc>) -> Result<PaymentMatch> {
        let payment_match = sqlx::query_as::<_, PaymentMatch>(
            r#"
            UPDATE payment_matches
            SET status = 'completed', completed_at = $2
            WHERE id = $1 AND status = 'awaiting_confirmation'
            RETURNING id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                      status, matched_by_operator, created_at, sent_at, completed_at
            "#
        )
        .bind(id)
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(payment_match)
    }

    /// All live matches, earliest deadline first
    pub async fn list_live(&self) -> Result<Vec<PaymentMatch>> {
        let matches = sqlx::query_as::<_, PaymentMatch>(
            r#"
            SELECT id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                   status, matched_by_operator, created_at, sent_at, completed_at
            FROM payment_matches
            WHERE status <> 'completed'
            ORDER BY payment_deadline ASC, id ASC
            "#
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    /// Live matches whose deadline has passed at `now`
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<PaymentMatch>> {
        let matches = sqlx::query_as::<_, PaymentMatch>(
            r#"
            SELECT id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                   status, matched_by_operator, created_at, sent_at, completed_at
            FROM payment_matches
            WHERE status <> 'completed' AND payment_deadline < $1
            ORDER BY payment_deadline ASC, id ASC
            "#
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    /// Match history of a user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<PaymentMatch>> {
        let matches = sqlx::query_as::<_, PaymentMatch>(
            r#"
            SELECT id, giver_id, receiver_id, help_activity_id, counterpart_activity_id, amount, payment_deadline,
                   status, matched_by_operator, created_at, sent_at, completed_at
            FROM payment_matches
            WHERE giver_id = $1 OR receiver_id = $1
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    pub async fn count_live(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_matches WHERE status <> 'completed'")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    pub async fn count_overdue(&self, now: DateTime<Utc>) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM payment_matches WHERE status <> 'completed' AND payment_deadline < $1"
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
