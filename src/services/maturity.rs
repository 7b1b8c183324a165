//! Maturity tracker
//!
//! Operator-driven lifecycle of a user's package subscription:
//! approve or reject once, extend after approval, reset back to pending.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use crate::database::DatabaseService;
use crate::models::user_package::UserPackage;
use crate::services::auth::AuthService;
use crate::services::clock::Clock;
use crate::utils::errors::{HelpChainError, Result};
use crate::utils::helpers::format_timestamp;
use crate::utils::logging::{log_operator_action, log_user_action};

#[derive(Clone)]
pub struct MaturityService {
    db: DatabaseService,
    clock: Arc<dyn Clock>,
    auth: AuthService,
}

impl MaturityService {
    pub fn new(db: DatabaseService, clock: Arc<dyn Clock>, auth: AuthService) -> Self {
        Self { db, clock, auth }
    }

    /// Subscribe a user to a package; the subscription waits for approval
    pub async fn subscribe(&self, user_id: i64, package_id: i64) -> Result<UserPackage> {
        debug!(user_id = user_id, package_id = package_id, "Subscribing user to package");

        if self.db.users.find_by_id(user_id).await?.is_none() {
            return Err(HelpChainError::not_found("User", user_id));
        }
        if self.db.packages.find_by_id(package_id).await?.is_none() {
            return Err(HelpChainError::not_found("Package", package_id));
        }

        let user_package = self.db.user_packages.create(user_id, package_id, self.clock.now()).await?;
        log_user_action(user_id, "subscribe_package", Some(&format!("package {}", package_id)));
        Ok(user_package)
    }

    pub async fn approve(&self, operator_user_id: i64, user_package_id: i64, maturity_date: DateTime<Utc>) -> Result<UserPackage> {
        let operator = self.auth.require_operator(operator_user_id)?;
        let now = self.clock.now();

        let mut tx = self.db.begin().await?;
        let user_package = self.lock(&mut tx, user_package_id).await?;
        user_package.check_approve(maturity_date, now)?;

        let user_package = self.db.user_packages.approve(&mut tx, user_package_id, maturity_date, now).await?;
        tx.commit().await?;

        log_operator_action(
            operator.get(),
            "approve_package",
            Some(&user_package_id.to_string()),
            Some(&format!("matures {}", format_timestamp(maturity_date))),
        );
        Ok(user_package)
    }

    pub async fn reject(&self, operator_user_id: i64, user_package_id: i64) -> Result<UserPackage> {
        let operator = self.auth.require_operator(operator_user_id)?;

        let mut tx = self.db.begin().await?;
        let user_package = self.lock(&mut tx, user_package_id).await?;
        user_package.check_reject()?;

        let user_package = self.db.user_packages.reject(&mut tx, user_package_id, self.clock.now()).await?;
        tx.commit().await?;

        log_operator_action(operator.get(), "reject_package", Some(&user_package_id.to_string()), None);
        Ok(user_package)
    }

    /// Move the maturity date later; no cap on the number of extensions
    pub async fn extend(&self, operator_user_id: i64, user_package_id: i64, new_maturity_date: DateTime<Utc>) -> Result<UserPackage> {
        let operator = self.auth.require_operator(operator_user_id)?;

        let mut tx = self.db.begin().await?;
        let user_package = self.lock(&mut tx, user_package_id).await?;
        user_package.check_extend(new_maturity_date)?;

        let user_package = self
            .db
            .user_packages
            .extend(&mut tx, user_package_id, new_maturity_date, self.clock.now())
            .await?;
        tx.commit().await?;

        log_operator_action(
            operator.get(),
            "extend_package",
            Some(&user_package_id.to_string()),
            Some(&format!(
                "matures {} (extension {})",
                format_timestamp(new_maturity_date),
                user_package.extended_count
            )),
        );
        Ok(user_package)
    }

    /// Back to pending; the extension count survives
    pub async fn reset(&self, operator_user_id: i64, user_package_id: i64) -> Result<UserPackage> {
        let operator = self.auth.require_operator(operator_user_id)?;

        let mut tx = self.db.begin().await?;
        self.lock(&mut tx, user_package_id).await?;
        let user_package = self.db.user_packages.reset(&mut tx, user_package_id, self.clock.now()).await?;
        tx.commit().await?;

        log_operator_action(operator.get(), "reset_package", Some(&user_package_id.to_string()), None);
        Ok(user_package)
    }

    async fn lock(&self, conn: &mut sqlx::PgConnection, user_package_id: i64) -> Result<UserPackage> {
        self.db
            .user_packages
            .lock_by_id(conn, user_package_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("User package", user_package_id))
    }

    /// Approved packages whose maturity date has passed
    pub async fn matured_packages(&self) -> Result<Vec<UserPackage>> {
        let matured = self.db.user_packages.list_matured(self.clock.now()).await?;
        info!(count = matured.len(), "Listed matured packages");
        Ok(matured)
    }

    pub async fn user_packages(&self, user_id: i64) -> Result<Vec<UserPackage>> {
        self.db.user_packages.list_for_user(user_id).await
    }
}
