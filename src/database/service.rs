//! Database service layer
//!
//! This module bundles the repositories behind one handle and owns
//! transaction boundaries for the engine services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use std::time::Instant;
use crate::database::{
    DatabasePool, UserRepository, PackageRepository, HelpActivityRepository, PaymentMatchRepository,
    ManualMatchRepository, UserPackageRepository, BannedAccountRepository,
};
use crate::models::HelpRole;
use crate::utils::errors::Result;
use crate::utils::logging::log_database_operation;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub users: UserRepository,
    pub packages: PackageRepository,
    pub activities: HelpActivityRepository,
    pub matches: PaymentMatchRepository,
    pub manual_matches: ManualMatchRepository,
    pub user_packages: UserPackageRepository,
    pub bans: BannedAccountRepository,
}

/// Point-in-time counters for the operator console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub pending_receivers: i64,
    pub pending_givers: i64,
    pub live_matches: i64,
    pub overdue_matches: i64,
    pub active_bans: i64,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            packages: PackageRepository::new(pool.clone()),
            activities: HelpActivityRepository::new(pool.clone()),
            matches: PaymentMatchRepository::new(pool.clone()),
            manual_matches: ManualMatchRepository::new(pool.clone()),
            user_packages: UserPackageRepository::new(pool.clone()),
            bans: BannedAccountRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Open a transaction; dropping it without commit rolls back
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Delete a user with every dependent row, all or nothing
    pub async fn purge_user(&self, user_id: i64) -> Result<u64> {
        let started = Instant::now();
        let mut tx = self.begin().await?;

        let outcome = self.users.delete_cascade(&mut tx, user_id).await;
        let removed = match outcome {
            Ok(removed) => removed,
            Err(e) => {
                log_database_operation("purge_user", "users", started.elapsed().as_millis() as u64, false);
                return Err(e);
            }
        };

        tx.commit().await?;
        log_database_operation("purge_user", "users", started.elapsed().as_millis() as u64, true);
        Ok(removed)
    }

    /// Get engine statistics
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<EngineStats> {
        Ok(EngineStats {
            pending_receivers: self.activities.count_pending(HelpRole::Receiver).await?,
            pending_givers: self.activities.count_pending(HelpRole::Giver).await?,
            live_matches: self.matches.count_live().await?,
            overdue_matches: self.matches.count_overdue(now).await?,
            active_bans: self.bans.count_active().await?,
        })
    }
}
