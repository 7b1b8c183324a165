//! User repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::user::{User, CreateUserRequest};
use crate::utils::errors::{HelpChainError, Result};

#[derive(Clone)]
#[derive(Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest, now: DateTime<Utc>) -> Result<User> {
        let email = request.email.clone();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, created_at
            "#
        )
        .bind(request.email)
        .bind(request.name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| HelpChainError::conflict_on_unique(e, format!("email {} is already registered", email)))
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, created_at FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lock the given user rows in id order and return the ids that exist.
    ///
    /// Every engine mutation that touches a user's obligations takes these
    /// locks first, which serializes concurrent writers per user.
    pub async fn lock_users(&self, conn: &mut PgConnection, ids: &[i64]) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        )
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Lock a single user row, failing with `NotFound` if it does not exist
    pub async fn lock_user(&self, conn: &mut PgConnection, id: i64) -> Result<()> {
        let found = self.lock_users(conn, &[id]).await?;
        if found.is_empty() {
            return Err(HelpChainError::not_found("User", id));
        }
        Ok(())
    }

    /// Delete a user and every row that depends on it.
    ///
    /// Runs on the caller's transaction; deletion order follows the foreign keys.
    pub async fn delete_cascade(&self, conn: &mut PgConnection, id: i64) -> Result<u64> {
        let mut removed = 0;

        // The other side of a live match goes back to the pool
        sqlx::query(
            r#"
            UPDATE help_activities
            SET status = 'pending', counterparty_id = NULL, matched_at = NULL, payment_deadline = NULL
            WHERE owner_id <> $1
              AND status IN ('matched', 'active')
              AND id IN (
                  SELECT help_activity_id FROM payment_matches
                  WHERE status <> 'completed' AND (giver_id = $1 OR receiver_id = $1)
                  UNION
                  SELECT counterpart_activity_id FROM payment_matches
                  WHERE status <> 'completed' AND (giver_id = $1 OR receiver_id = $1)
                    AND counterpart_activity_id IS NOT NULL
              )
            "#
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        removed +=sqlx::query("DELETE FROM payment_matches WHERE giver_id = $1 OR receiver_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        // Counterparties keep their activity, unpaired
        sqlx::query("UPDATE help_activities SET counterparty_id = NULL WHERE counterparty_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        // Live matches of others may still reference this user's activities
        removed += sqlx::query(
            r#"
            DELETE FROM payment_matches
            WHERE help_activity_id IN (SELECT id FROM help_activities WHERE owner_id = $1)
               OR counterpart_activity_id IN (SELECT id FROM help_activities WHERE owner_id = $1)
            "#
        )
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        for statement in [
            "DELETE FROM help_activities WHERE owner_id = $1",
            "DELETE FROM manual_matches WHERE user_id = $1",
            "DELETE FROM user_packages WHERE user_id = $1",
            "DELETE FROM banned_accounts WHERE user_id = $1",
        ] {
            removed += sqlx::query(statement)
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected();
        }

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(HelpChainError::not_found("User", id));
        }

        Ok(removed + deleted)
    }
}
