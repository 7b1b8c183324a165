//! Obligation registry
//!
//! Tracks each user's standing intent to give or receive and enforces the
//! one-open-activity-per-role rule. Giving precedes receiving: a request is
//! only accepted while the user holds an open offer.

use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::database::DatabaseService;
use crate::models::help_activity::{HelpActivity, HelpRole, HelpStatus, CreateHelpActivityRequest};
use crate::services::auth::AuthService;
use crate::services::clock::Clock;
use crate::services::collaborators::PackageCatalog;
use crate::utils::errors::{HelpChainError, Result};
use crate::utils::logging::{log_operator_action, log_user_action};

#[derive(Clone)]
pub struct ObligationService {
    db: DatabaseService,
    catalog: Arc<dyn PackageCatalog>,
    clock: Arc<dyn Clock>,
    auth: AuthService,
}

impl ObligationService {
    pub fn new(db: DatabaseService, catalog: Arc<dyn PackageCatalog>, clock: Arc<dyn Clock>, auth: AuthService) -> Self {
        Self { db, catalog, clock, auth }
    }

    /// Register a standing offer to give
    pub async fn register_offer(&self, user_id: i64, package_id: i64) -> Result<HelpActivity> {
        self.register(user_id, package_id, HelpRole::Giver).await
    }

    /// Register a standing request to receive
    pub async fn register_request(&self, user_id: i64, package_id: i64) -> Result<HelpActivity> {
        self.register(user_id, package_id, HelpRole::Receiver).await
    }

    async fn register(&self, user_id: i64, package_id: i64, role: HelpRole) -> Result<HelpActivity> {
        debug!(user_id = user_id, package_id = package_id, role = %role, "Registering help activity");

        if package_id <= 0 {
            return Err(HelpChainError::invalid("package_id", "a package must be selected"));
        }

        let amount = self
            .catalog
            .amount_of(package_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("Package", package_id))?;

        let mut tx = self.db.begin().await?;
        self.db.users.lock_user(&mut tx, user_id).await?;

        if self.db.bans.find_active_for_user(&mut tx, user_id).await?.is_some() {
            return Err(HelpChainError::PreconditionFailed(
                "the account is suspended".to_string(),
            ));
        }

        let open_offer = self.db.activities.find_open(&mut tx, user_id, HelpRole::Giver).await?;
        match role {
            HelpRole::Giver => {
                if let Some(existing) = open_offer {
                    return Err(HelpChainError::Conflict(format!(
                        "an offer to give is already open (activity {})",
                        existing.id
                    )));
                }
            }
            HelpRole::Receiver => {
                if open_offer.is_none() {
                    return Err(HelpChainError::PreconditionFailed(
                        "you must offer help before requesting it".to_string(),
                    ));
                }
                if let Some(existing) = self.db.activities.find_open(&mut tx, user_id, HelpRole::Receiver).await? {
                    return Err(HelpChainError::Conflict(format!(
                        "a request to receive is already open (activity {})",
                        existing.id
                    )));
                }
            }
        }

        let request = CreateHelpActivityRequest {
            owner_id: user_id,
            role,
            package_id,
            amount,
        };
        let activity = self.db.activities.insert(&mut tx, request, self.clock.now()).await?;
        tx.commit().await?;

        log_user_action(user_id, &format!("register_{}", role), Some(&format!("activity {}", activity.id)));
        Ok(activity)
    }

    /// Withdraw a pending activity; only its owner may do so
    pub async fn cancel(&self, activity_id: i64, requesting_user_id: i64) -> Result<HelpActivity> {
        debug!(activity_id = activity_id, user_id = requesting_user_id, "Cancelling help activity");

        let mut tx = self.db.begin().await?;
        let mut activity = self
            .db
            .activities
            .lock_by_id(&mut tx, activity_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("Help activity", activity_id))?;

        if !activity.is_owned_by(requesting_user_id) {
            warn!(activity_id = activity_id, user_id = requesting_user_id, "Cancel attempted by non-owner");
            return Err(HelpChainError::Unauthorized(
                "only the owner can cancel this activity".to_string(),
            ));
        }

        if activity.status != HelpStatus::Pending {
            return Err(HelpChainError::Conflict(format!(
                "activity is {} and can no longer be cancelled",
                activity.status.as_str()
            )));
        }

        self.db.activities.set_status(&mut tx, &[activity_id], HelpStatus::Cancelled).await?;
        tx.commit().await?;

        activity.status = HelpStatus::Cancelled;
        log_user_action(requesting_user_id, "cancel_activity", Some(&format!("activity {}", activity_id)));
        Ok(activity)
    }

    /// Return a matched activity to the pool.
    ///
    /// Refused while any live payment match still references the activity.
    pub async fn reset_activity(&self, operator_user_id: i64, activity_id: i64) -> Result<HelpActivity> {
        let operator = self.auth.require_operator(operator_user_id)?;

        let mut tx = self.db.begin().await?;
        let activity = self
            .db
            .activities
            .lock_by_id(&mut tx, activity_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("Help activity", activity_id))?;

        if activity.status != HelpStatus::Matched {
            return Err(HelpChainError::PreconditionFailed(format!(
                "only matched activities can be reset, this one is {}",
                activity.status.as_str()
            )));
        }

        let live = self.db.matches.count_live_for_activity(&mut tx, activity_id).await?;
        if live > 0 {
            return Err(HelpChainError::Conflict(
                "activity is still bound to a live payment match".to_string(),
            ));
        }

        let activity = self.db.activities.reset_to_pending(&mut tx, activity_id).await?;
        tx.commit().await?;

        log_operator_action(operator.get(), "reset_activity", Some(&activity_id.to_string()), None);
        info!(activity_id = activity_id, "Help activity returned to pending");
        Ok(activity)
    }

    /// Open activities of a user
    pub async fn open_activities(&self, user_id: i64) -> Result<Vec<HelpActivity>> {
        self.db.activities.list_open_for_user(user_id).await
    }

    /// Full activity history of a user
    pub async fn activity_history(&self, user_id: i64) -> Result<Vec<HelpActivity>> {
        self.db.activities.list_for_user(user_id).await
    }
}
