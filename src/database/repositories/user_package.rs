//! User package repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::user_package::UserPackage;
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct UserPackageRepository {
    pool: PgPool,
}

impl UserPackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending subscription
    pub async fn create(&self, user_id: i64, package_id: i64, now: DateTime<Utc>) -> Result<UserPackage> {
        let user_package = sqlx::query_as::<_, UserPackage>(
            r#"
            INSERT INTO user_packages (user_id, package_id, status, admin_approved, extended_count, created_at, updated_at)
            VALUES ($1, $2, 'pending', FALSE, 0, $3, $3)
            RETURNING id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at
            "#
        )
        .bind(user_id)
        .bind(package_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_package)
    }

    /// Find user package by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<UserPackage>> {
        let user_package = sqlx::query_as::<_, UserPackage>(
            "SELECT id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at FROM user_packages WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_package)
    }

    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i64) -> Result<Option<UserPackage>> {
        let user_package = sqlx::query_as::<_, UserPackage>(
            "SELECT id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at FROM user_packages WHERE id = $1 FOR UPDATE"
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user_package)
    }

    pub async fn approve(&self, conn: &mut PgConnection, id: i64, maturity_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<UserPackage> {
        let user_package = sqlx::query_as::<_, UserPackage>(
            r#"
            UPDATE user_packages
            SET admin_approved = TRUE, status = 'active', maturity_date = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(maturity_date)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user_package)
    }

    pub async fn reject(&self, conn: &mut PgConnection, id: i64, now: DateTime<Utc>) -> Result<UserPackage> {
        let user_package = sqlx::query_as::<_, UserPackage>(
            r#"
            UPDATE user_packages
            SET status = 'rejected', updated_at = $2
            WHERE id = $1
            RETURNING id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user_package)
    }

    /// Overwrite the maturity date and bump the extension counter
    pub async fn extend(&self, conn: &mut PgConnection, id: i64, new_maturity_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<UserPackage> {
        let user_package = sqlx::query_as::<_, UserPackage>(
            r#"
            UPDATE user_packages
            SET maturity_date = $2, extended_count = extended_count + 1, updated_at = $3
            WHERE id = $1
            RETURNING id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(new_maturity_date)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user_package)
    }

    /// Back to pending; `extended_count` is left as the audit trail
    pub async fn reset(&self, conn: &mut PgConnection, id: i64, now: DateTime<Utc>) -> Result<UserPackage> {
        let user_package = sqlx::query_as::<_, UserPackage>(
            r#"
            UPDATE user_packages
            SET status = 'pending', admin_approved = FALSE, maturity_date = NULL, updated_at = $2
            WHERE id = $1
            RETURNING id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user_package)
    }

    /// Approved packages whose maturity date has passed
    pub async fn list_matured(&self, now: DateTime<Utc>) -> Result<Vec<UserPackage>> {
        let packages = sqlx::query_as::<_, UserPackage>(
            r#"
            SELECT id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at
            FROM user_packages
            WHERE admin_approved AND maturity_date IS NOT NULL AND maturity_date <= $1
            ORDER BY maturity_date ASC
            "#
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(packages)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<UserPackage>> {
        let packages = sqlx::query_as::<_, UserPackage>(
            "SELECT id, user_id, package_id, status, admin_approved, maturity_date, extended_count, created_at, updated_at FROM user_packages WHERE user_id = $1 ORDER BY created_at DESC"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(packages)
    }
}
