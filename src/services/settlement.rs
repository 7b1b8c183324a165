//! Settlement state machine
//!
//! `pending -> awaiting_confirmation -> completed`, driven by confirmation
//! signals from the two parties or by an operator. Duplicate signals return
//! the match as it stands instead of failing.

use std::sync::Arc;
use sqlx::PgConnection;
use tracing::{debug, info};
use crate::database::DatabaseService;
use crate::models::help_activity::HelpStatus;
use crate::models::payment_match::{MatchStatus, PaymentMatch, Transition};
use crate::services::auth::AuthService;
use crate::services::clock::Clock;
use crate::utils::errors::{HelpChainError, Result};
use crate::utils::logging::{log_match_event, log_operator_action};

#[derive(Clone)]
pub struct SettlementService {
    db: DatabaseService,
    clock: Arc<dyn Clock>,
    auth: AuthService,
}

impl SettlementService {
    pub fn new(db: DatabaseService, clock: Arc<dyn Clock>, auth: AuthService) -> Self {
        Self { db, clock, auth }
    }

    async fn lock_match(&self, conn: &mut PgConnection, match_id: i64) -> Result<PaymentMatch> {
        self.db
            .matches
            .lock_by_id(conn, match_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("Payment match", match_id))
    }

    /// Giver reports that the payment went out
    pub async fn confirm_sent(&self, match_id: i64, requesting_user_id: i64) -> Result<PaymentMatch> {
        debug!(match_id = match_id, user_id = requesting_user_id, "Confirming payment sent");

        let mut tx = self.db.begin().await?;
        let payment_match = self.lock_match(&mut tx, match_id).await?;

        if payment_match.giver_id != requesting_user_id {
            return Err(HelpChainError::Unauthorized(
                "only the giver of this match can confirm sending".to_string(),
            ));
        }

        match payment_match.status.confirm_sent() {
            Transition::AlreadyApplied => {
                debug!(match_id = match_id, status = payment_match.status.as_str(), "Sent confirmation already recorded");
                Ok(payment_match)
            }
            Transition::Advance(_) => {
                let updated = self.apply_sent(&mut tx, &payment_match).await?;
                tx.commit().await?;
                log_match_event(updated.id, "payment_sent", updated.giver_id, updated.receiver_id);
                Ok(updated)
            }
        }
    }

    /// Receiver confirms that the payment arrived
    pub async fn confirm_received(&self, match_id: i64, requesting_user_id: i64) -> Result<PaymentMatch> {
        debug!(match_id = match_id, user_id = requesting_user_id, "Confirming payment received");

        let mut tx = self.db.begin().await?;
        let payment_match = self.lock_match(&mut tx, match_id).await?;

        if payment_match.receiver_id != requesting_user_id {
            return Err(HelpChainError::Unauthorized(
                "only the receiver of this match can confirm receipt".to_string(),
            ));
        }

        match payment_match.status.confirm_received()? {
            Transition::AlreadyApplied => Ok(payment_match),
            Transition::Advance(_) => {
                let updated = self.apply_completed(&mut tx, &payment_match).await?;
                tx.commit().await?;
                log_match_event(updated.id, "completed", updated.giver_id, updated.receiver_id);
                Ok(updated)
            }
        }
    }

    /// Operator marks the match settled.
    ///
    /// From `pending` both steps are applied at once, stamping `sent_at`
    /// and `completed_at` with the same instant.
    pub async fn operator_confirm(&self, operator_user_id: i64, match_id: i64) -> Result<PaymentMatch> {
        let operator = self.auth.require_operator(operator_user_id)?;

        let mut tx = self.db.begin().await?;
        let mut payment_match = self.lock_match(&mut tx, match_id).await?;

        if payment_match.status == MatchStatus::Completed {
            return Ok(payment_match);
        }

        if let Transition::Advance(_) = payment_match.status.confirm_sent() {
            payment_match = self.apply_sent(&mut tx, &payment_match).await?;
        }
        let updated = self.apply_completed(&mut tx, &payment_match).await?;
        tx.commit().await?;

        log_operator_action(operator.get(), "confirm_match", Some(&match_id.to_string()), None);
        log_match_event(updated.id, "completed", updated.giver_id, updated.receiver_id);
        Ok(updated)
    }

    async fn apply_sent(&self, conn: &mut PgConnection, payment_match: &PaymentMatch) -> Result<PaymentMatch> {
        let updated = self.db.matches.mark_sent(conn, payment_match.id, self.clock.now()).await?;
        self.db
            .activities
            .set_status(conn, &updated.activity_ids(), HelpStatus::Active)
            .await?;
        Ok(updated)
    }

    async fn apply_completed(&self, conn: &mut PgConnection, payment_match: &PaymentMatch) -> Result<PaymentMatch> {
        let updated = self.db.matches.mark_completed(conn, payment_match.id, self.clock.now()).await?;
        self.db
            .activities
            .set_status(conn, &updated.activity_ids(), HelpStatus::Completed)
            .await?;
        info!(match_id = updated.id, amount = %updated.amount, "Payment match settled");
        Ok(updated)
    }

    pub async fn find_match(&self, match_id: i64) -> Result<PaymentMatch> {
        self.db
            .matches
            .find_by_id(match_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("Payment match", match_id))
    }

    /// Every match a user has been part of, newest first
    pub async fn match_history(&self, user_id: i64) -> Result<Vec<PaymentMatch>> {
        self.db.matches.list_for_user(user_id).await
    }
}
