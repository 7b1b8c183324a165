//! Package catalog repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::models::user::Package;
use crate::utils::errors::{HelpChainError, Result};

#[derive(Clone, Debug)]
pub struct PackageRepository {
    pool: PgPool,
}

impl PackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a catalog entry
    pub async fn create(&self, name: &str, amount: Decimal, maturity_days: i32, now: DateTime<Utc>) -> Result<Package> {
        if amount <= Decimal::ZERO {
            return Err(HelpChainError::invalid("amount", "package amount must be positive"));
        }

        let package = sqlx::query_as::<_, Package>(
            r#"
            INSERT INTO packages (name, amount, maturity_days, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, amount, maturity_days, created_at
            "#
        )
        .bind(name)
        .bind(amount)
        .bind(maturity_days)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(package)
    }

    /// Find package by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Package>> {
        let package = sqlx::query_as::<_, Package>(
            "SELECT id, name, amount, maturity_days, created_at FROM packages WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(package)
    }
}
