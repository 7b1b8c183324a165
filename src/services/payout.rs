//! Dashboard read model
//!
//! Everything a member's client polls for: open activities, the live match
//! with the counterparty and its deadline, and any manual arrangement.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::database::DatabaseService;
use crate::models::help_activity::{HelpActivity, HelpRole};
use crate::models::manual_match::ManualMatch;
use crate::models::payment_match::PaymentMatch;
use crate::models::user::User;
use crate::services::clock::Clock;
use crate::services::deadline::DeadlineStatus;
use crate::utils::errors::{HelpChainError, Result};

/// The user's side of their live payment match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveMatchState {
    pub role: HelpRole,
    pub counterparty: User,
    pub payment_match: PaymentMatch,
    pub deadline_status: DeadlineStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayoutState {
    pub user_id: i64,
    pub banned: bool,
    pub offer: Option<HelpActivity>,
    pub request: Option<HelpActivity>,
    pub live_match: Option<LiveMatchState>,
    pub manual_matches: Vec<ManualMatch>,
}

#[derive(Clone)]
pub struct PayoutService {
    db: DatabaseService,
    clock: Arc<dyn Clock>,
}

impl PayoutService {
    pub fn new(db: DatabaseService, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn user_payout_state(&self, user_id: i64) -> Result<UserPayoutState> {
        if self.db.users.find_by_id(user_id).await?.is_none() {
            return Err(HelpChainError::not_found("User", user_id));
        }

        let open = self.db.activities.list_open_for_user(user_id).await?;
        let (offer, request) = open.into_iter().fold((None, None), |(offer, request), activity| match activity.role {
            HelpRole::Giver => (Some(activity), request),
            HelpRole::Receiver => (offer, Some(activity)),
        });

        let live_match = match self.db.matches.find_live_for_user(self.db.pool(), user_id).await? {
            Some(payment_match) => Some(self.live_match_state(user_id, payment_match).await?),
            None => None,
        };

        Ok(UserPayoutState {
            user_id,
            banned: self.db.bans.is_banned(user_id).await?,
            offer,
            request,
            live_match,
            manual_matches: self.db.manual_matches.list_active_for_user(user_id).await?,
        })
    }

    async fn live_match_state(&self, user_id: i64, payment_match: PaymentMatch) -> Result<LiveMatchState> {
        let role = if payment_match.giver_id == user_id {
            HelpRole::Giver
        } else {
            HelpRole::Receiver
        };
        let counterparty_id = payment_match.counterparty_of(user_id).unwrap_or(payment_match.giver_id);
        let counterparty = self
            .db
            .users
            .find_by_id(counterparty_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("User", counterparty_id))?;

        Ok(LiveMatchState {
            role,
            counterparty,
            deadline_status: DeadlineStatus::of(&payment_match, self.clock.now()),
            payment_match,
        })
    }
}
