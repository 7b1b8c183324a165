//! Ban ledger
//!
//! Appends suspensions and lifts them. Open obligations of a banned user are
//! left untouched for audit; revoking access is the collaborator's job, so
//! every committed change is handed to the [`BanEventSink`].

use std::sync::Arc;
use tracing::{debug, error};
use crate::database::DatabaseService;
use crate::models::banned_account::{BanEvent, BannedAccount, CreateBanRequest};
use crate::services::auth::AuthService;
use crate::services::clock::Clock;
use crate::services::collaborators::BanEventSink;
use crate::utils::errors::{HelpChainError, Result};
use crate::utils::helpers::normalize_whitespace;
use crate::utils::logging::{log_ban_event, log_operator_action};

#[derive(Clone)]
pub struct BanService {
    db: DatabaseService,
    clock: Arc<dyn Clock>,
    auth: AuthService,
    sink: Arc<dyn BanEventSink>,
}

impl BanService {
    pub fn new(db: DatabaseService, clock: Arc<dyn Clock>, auth: AuthService, sink: Arc<dyn BanEventSink>) -> Self {
        Self { db, clock, auth, sink }
    }

    pub async fn ban_user(&self, operator_user_id: i64, user_id: i64, reason: &str) -> Result<BannedAccount> {
        let operator = self.auth.require_operator(operator_user_id)?;
        debug!(user_id = user_id, operator_id = operator.get(), "Banning user");

        let reason = normalize_whitespace(reason);
        if reason.is_empty() {
            return Err(HelpChainError::invalid("reason", "a ban needs a reason"));
        }

        let mut tx = self.db.begin().await?;
        self.db.users.lock_user(&mut tx, user_id).await?;

        if let Some(existing) = self.db.bans.find_active_for_user(&mut tx, user_id).await? {
            return Err(HelpChainError::Conflict(format!(
                "user {} is already banned (ban {})",
                user_id, existing.id
            )));
        }

        let request = CreateBanRequest {
            user_id,
            reason,
            banned_by: operator.get(),
        };
        let ban = self.db.bans.insert(&mut tx, request, self.clock.now()).await?;
        tx.commit().await?;

        log_operator_action(operator.get(), "ban_user", Some(&user_id.to_string()), Some(&ban.reason));
        log_ban_event(user_id, true, Some(&ban.reason));

        self.publish(BanEvent::Banned {
            ban_id: ban.id,
            user_id,
            reason: ban.reason.clone(),
            banned_by: ban.banned_by,
            at: ban.banned_at,
        })
        .await;

        Ok(ban)
    }

    /// Lift an active ban by its ledger id
    pub async fn unban_user(&self, operator_user_id: i64, ban_id: i64) -> Result<BannedAccount> {
        let operator = self.auth.require_operator(operator_user_id)?;

        let mut tx = self.db.begin().await?;
        let ban = self
            .db
            .bans
            .lock_by_id(&mut tx, ban_id)
            .await?
            .filter(|b| b.is_active)
            .ok_or_else(|| HelpChainError::not_found("Active ban", ban_id))?;

        let ban = self.db.bans.deactivate(&mut tx, ban.id, self.clock.now()).await?;
        tx.commit().await?;

        log_operator_action(operator.get(), "unban_user", Some(&ban.user_id.to_string()), None);
        log_ban_event(ban.user_id, false, None);

        self.publish(BanEvent::Unbanned {
            ban_id: ban.id,
            user_id: ban.user_id,
            unbanned_by: operator.get(),
            at: ban.unbanned_at.unwrap_or_else(|| self.clock.now()),
        })
        .await;

        Ok(ban)
    }

    // The ledger row is committed already; a sink failure must not undo it
    async fn publish(&self, event: BanEvent) {
        if let Err(e) = self.sink.publish(&event).await {
            error!(user_id = event.user_id(), error = %e, "Failed to deliver ban event");
        }
    }

    pub async fn banned_accounts(&self, active_only: bool) -> Result<Vec<BannedAccount>> {
        self.db.bans.list(active_only).await
    }

    pub async fn is_banned(&self, user_id: i64) -> Result<bool> {
        self.db.bans.is_banned(user_id).await
    }
}
