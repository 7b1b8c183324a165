//! Help activity repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::help_activity::{HelpActivity, HelpRole, HelpStatus, CreateHelpActivityRequest};
use crate::utils::errors::{HelpChainError, Result};

#[derive(Clone, Debug)]
pub struct HelpActivityRepository {
    pool: PgPool,
}

impl HelpActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new pending activity.
    ///
    /// The partial unique index on `(owner_id, role)` turns a racing duplicate into a `Conflict`.
    pub async fn insert(&self, conn: &mut PgConnection, request: CreateHelpActivityRequest, now: DateTime<Utc>) -> Result<HelpActivity> {
        let role = request.role;
        sqlx::query_as::<_, HelpActivity>(
            r#"
            INSERT INTO help_activities (owner_id, role, package_id, amount, status, created_at)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING id, owner_id, role, counterparty_id, package_id, amount, status, admin_approved,
                      created_at, matched_at, maturity_date, payment_deadline
            "#
        )
        .bind(request.owner_id)
        .bind(request.role)
        .bind(request.package_id)
        .bind(request.amount)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| HelpChainError::conflict_on_unique(e, format!("user already has an open {} activity", role)))
    }

    /// Find activity by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<HelpActivity>> {
        let activity = sqlx::query_as::<_, HelpActivity>(
            r#"
            SELECT id, owner_id, role, counterparty_id, package_id, amount, status, admin_approved,
                   created_at, matched_at, maturity_date, payment_deadline
            FROM help_activities WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(activity)
    }

    /// Find activity by ID and hold its row lock until the transaction ends
    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i64) -> Result<Option<HelpActivity>> {
        let activity = sqlx::query_as::<_, HelpActivity>(
            r#"
            SELECT id, owner_id, role, counterparty_id, package_id, amount, status, admin_approved,
                   created_at, matched_at, maturity_date, payment_deadline
            FROM help_activities WHERE id = $1
            FOR UPDATE
            "#
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(activity)
    }

    /// The user's open (pending, matched or active) activity in the given role
    pub async fn find_open(&self, conn: &mut PgConnection, owner_id: i64, role: HelpRole) -> Result<Option<HelpActivity>> {
        let activity = sqlx::query_as::<_, HelpActivity>(
            r#"
            SELECT id, owner_id, role, counterparty_id, package_id, amount, status, admin_approved,
                   created_at, matched_at, maturity_date, payment_deadline
            FROM help_activities
            WHERE owner_id = $1 AND role = $2 AND status IN ('pending', 'matched', 'active')
            FOR UPDATE
            "#
        )
        .bind(owner_id)
        .bind(role)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(activity)
    }

    /// Open activities of a user, both roles
    pub async fn list_open_for_user(&self, owner_id: i64) -> Result<Vec<HelpActivity>> {
        let activities = sqlx::query_as::<_, HelpActivity>(
            r#"
            SELECT id, owner_id, role, counterparty_id, package_id, amount, status, admin_approved,
                   created_at, matched_at, maturity_date, payment_deadline
            FROM help_activities
            WHERE owner_id = $1 AND status IN ('pending', 'matched', 'active')
            ORDER BY created_at ASC
            "#
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(activities)
    }

    /// Full activity history of a user, newest first
    pub async fn list_for_user(&self, owner_id: i64) -> Result<Vec<HelpActivity>> {
        let activities = sqlx::query_as::<_, HelpActivity>(
            r#"
            SELECT id, owner_id, role, counterparty_id, package_id, amount, status, admin_approved,
                   created_at, matched_at, maturity_date, payment_deadline
            FROM help_activities
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(activities)
    }

    /// Pending activities eligible for automatic matching, oldest first.
    ///
    /// Owners holding a live payment match, an active manual match or an
    /// active ban are left out. `None` returns the whole pool.
    pub async fn list_matchable(&self, role: HelpRole, limit: Option<i64>) -> Result<Vec<HelpActivity>> {
        let activities = sqlx::query_as::<_, HelpActivity>(
            r#"
            SELECT ha.id, ha.owner_id, ha.role, ha.counterparty_id, ha.package_id, ha.amount, ha.status,
                   ha.admin_approved, ha.created_at, ha.matched_at, ha.maturity_date, ha.payment_deadline
            FROM help_activities ha
            WHERE ha.role = $1
              AND ha.status = 'pending'
              AND NOT EXISTS (
                  SELECT 1 FROM payment_matches pm
                  WHERE pm.status <> 'completed'
                    AND (pm.giver_id = ha.owner_id OR pm.receiver_id = ha.owner_id)
              )
              AND NOT EXISTS (
                  SELECT 1 FROM manual_matches mm
                  WHERE mm.status = 'active' AND mm.user_id = ha.owner_id
              )
              AND NOT EXISTS (
                  SELECT 1 FROM banned_accounts ba
                  WHERE ba.is_active AND ba.user_id = ha.owner_id
              )
            ORDER BY ha.created_at ASC, ha.id ASC
            LIMIT $2
            "#
        )
        .bind(role)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(activities)
    }

    /// Stamp an activity as paired with `counterparty_id`
    pub async fn mark_matched(
        &self,
        conn: &mut PgConnection,
        id: i64,
        counterparty_id: i64,
        matched_at: DateTime<Utc>,
        payment_deadline: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE help_activities
            SET status = 'matched', counterparty_id = $2, matched_at = $3, payment_deadline = $4
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(counterparty_id)
        .bind(matched_at)
        .bind(payment_deadline)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Move a set of activities to a new status
    pub async fn set_status(&self, conn: &mut PgConnection, ids: &[i64], status: HelpStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE help_activities SET status = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(status)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Return a matched activity to the pool, clearing its pairing stamps
    pub async fn reset_to_pending(&self, conn: &mut PgConnection, id: i64) -> Result<HelpActivity> {
        let activity = sqlx::query_as::<_, HelpActivity>(
            r#"
            UPDATE help_activities
            SET status = 'pending', counterparty_id = NULL, matched_at = NULL, payment_deadline = NULL
            WHERE id = $1
            RETURNING id, owner_id, role, counterparty_id, package_id, amount, status, admin_approved,
                      created_at, matched_at, maturity_date, payment_deadline
            "#
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(activity)
    }

    /// Count pending activities in a role (for stats)
    pub async fn count_pending(&self, role: HelpRole) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM help_activities WHERE role = $1 AND status = 'pending'"
        )
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
