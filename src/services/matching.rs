//! Matching engine
//!
//! Pairs unmatched receivers with unmatched givers. Two entry points exist:
//! the automatic bulk run over both candidate pools, and operator-driven
//! pairing (either two members, or a member and an out-of-band counterparty
//! recorded as a manual match).
//!
//! Candidate selection happens outside any transaction. Every pairing then
//! re-validates both parties inside its own transaction, under row locks on
//! the two user rows, so concurrent runs can never pair anyone twice.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::config::EngineConfig;
use crate::database::DatabaseService;
use crate::models::help_activity::{HelpActivity, HelpRole, HelpStatus};
use crate::models::manual_match::{ManualMatch, ManualMatchStatus, CounterpartyDetails, CreateManualMatchRequest};
use crate::models::payment_match::{PaymentMatch, MatchedBy, CreatePaymentMatchRequest};
use crate::services::auth::AuthService;
use crate::services::clock::Clock;
use crate::utils::errors::{ErrorKind, HelpChainError, Result};
use crate::utils::logging::{log_match_event, log_operator_action};

/// A pool entry considered by the automatic run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub activity_id: i64,
    pub user_id: i64,
}

impl From<&HelpActivity> for Candidate {
    fn from(activity: &HelpActivity) -> Self {
        Self {
            activity_id: activity.id,
            user_id: activity.owner_id,
        }
    }
}

/// A receiver/giver pair chosen by [`select_pairs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub receiver: Candidate,
    pub giver: Candidate,
}

/// Pair each receiver with the oldest giver still available.
///
/// Both slices are expected oldest-first. A giver is never paired with
/// itself, and nobody takes part in more than one pairing per run: a user
/// who already gave in this run is skipped as a receiver and vice versa.
pub fn select_pairs(receivers: &[Candidate], givers: &[Candidate]) -> Vec<Pairing> {
    let mut engaged: HashSet<i64> = HashSet::new();
    let mut pairs = Vec::new();

    for receiver in receivers {
        if engaged.contains(&receiver.user_id) {
            continue;
        }

        let giver = givers
            .iter()
            .find(|g| g.user_id != receiver.user_id && !engaged.contains(&g.user_id));

        if let Some(giver) = giver {
            engaged.insert(receiver.user_id);
            engaged.insert(giver.user_id);
            pairs.push(Pairing {
                receiver: *receiver,
                giver: *giver,
            });
        }
    }

    pairs
}

/// Inputs of the pairing primitive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatchCommand {
    pub giver_id: i64,
    pub receiver_id: i64,
    pub help_activity_id: i64,
    pub amount: Decimal,
    pub matched_by: MatchedBy,
}

/// Why an automatic pairing was not created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedPairing {
    pub receiver_activity_id: i64,
    pub giver_id: i64,
    pub reason: String,
}

/// Outcome of one automatic run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoMatchReport {
    pub run_id: Uuid,
    pub receivers_considered: usize,
    pub givers_considered: usize,
    pub created: Vec<PaymentMatch>,
    pub skipped: Vec<SkippedPairing>,
}

#[derive(Clone)]
pub struct MatchingService {
    db: DatabaseService,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    auth: AuthService,
}

impl MatchingService {
    pub fn new(db: DatabaseService, clock: Arc<dyn Clock>, config: EngineConfig, auth: AuthService) -> Self {
        Self { db, clock, config, auth }
    }

    fn payment_window(&self) -> Duration {
        Duration::hours(self.config.payment_window_hours)
    }

    /// Unmatched receivers, oldest first
    pub async fn pending_receivers(&self) -> Result<Vec<HelpActivity>> {
        self.db.activities.list_matchable(HelpRole::Receiver, None).await
    }

    /// Unmatched givers, oldest first, excluding manually matched users
    pub async fn available_givers(&self) -> Result<Vec<HelpActivity>> {
        self.db.activities.list_matchable(HelpRole::Giver, None).await
    }

    /// Run automatic matching over the current pools
    pub async fn auto_match(&self, operator_user_id: i64) -> Result<AutoMatchReport> {
        let operator = self.auth.require_operator(operator_user_id)?;
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, operator_id = operator.get(), "Starting auto-match run");

        let limit = Some(self.config.auto_match_batch_limit);
        let receivers = self.db.activities.list_matchable(HelpRole::Receiver, limit).await?;
        let givers = self.db.activities.list_matchable(HelpRole::Giver, limit).await?;

        let receiver_candidates: Vec<Candidate> = receivers.iter().map(Candidate::from).collect();
        let giver_candidates: Vec<Candidate> = givers.iter().map(Candidate::from).collect();
        let pairs = select_pairs(&receiver_candidates, &giver_candidates);

        let mut report = AutoMatchReport {
            run_id,
            receivers_considered: receivers.len(),
            givers_considered: givers.len(),
            created: Vec::with_capacity(pairs.len()),
            skipped: Vec::new(),
        };

        for pairing in pairs {
            let amount = receivers
                .iter()
                .find(|r| r.id == pairing.receiver.activity_id)
                .map(|r| r.amount)
                .unwrap_or_default();

            let command = CreateMatchCommand {
                giver_id: pairing.giver.user_id,
                receiver_id: pairing.receiver.user_id,
                help_activity_id: pairing.receiver.activity_id,
                amount,
                matched_by: MatchedBy::Auto,
            };

            match self.create_match(command).await {
                Ok(payment_match) => report.created.push(payment_match),
                Err(e) if matches!(e.kind(), ErrorKind::Conflict | ErrorKind::PreconditionFailed | ErrorKind::NotFound) => {
                    warn!(
                        run_id = %run_id,
                        receiver_activity_id = pairing.receiver.activity_id,
                        giver_id = pairing.giver.user_id,
                        error = %e,
                        "Skipping pairing"
                    );
                    report.skipped.push(SkippedPairing {
                        receiver_activity_id: pairing.receiver.activity_id,
                        giver_id: pairing.giver.user_id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            run_id = %run_id,
            created = report.created.len(),
            skipped = report.skipped.len(),
            "Auto-match run finished"
        );
        Ok(report)
    }

    /// Operator pairs two members explicitly
    pub async fn create_operator_match(
        &self,
        operator_user_id: i64,
        giver_id: i64,
        receiver_id: i64,
        help_activity_id: i64,
        amount: Decimal,
    ) -> Result<PaymentMatch> {
        let operator = self.auth.require_operator(operator_user_id)?;
        let payment_match = self
            .create_match(CreateMatchCommand {
                giver_id,
                receiver_id,
                help_activity_id,
                amount,
                matched_by: MatchedBy::Operator(operator.get()),
            })
            .await?;

        log_operator_action(
            operator.get(),
            "create_match",
            Some(&payment_match.id.to_string()),
            Some(&format!("giver {} -> receiver {}", giver_id, receiver_id)),
        );
        Ok(payment_match)
    }

    /// Pairing primitive: one transaction that re-checks both parties,
    /// inserts the match and stamps the activities as matched
    pub async fn create_match(&self, command: CreateMatchCommand) -> Result<PaymentMatch> {
        debug!(
            giver_id = command.giver_id,
            receiver_id = command.receiver_id,
            help_activity_id = command.help_activity_id,
            "Creating payment match"
        );

        if command.amount <= Decimal::ZERO {
            return Err(HelpChainError::invalid("amount", "amount must be positive"));
        }
        if command.giver_id == command.receiver_id {
            return Err(HelpChainError::invalid("receiver_id", "giver and receiver must be different users"));
        }

        let mut tx = self.db.begin().await?;

        let parties = [command.giver_id, command.receiver_id];
        let found = self.db.users.lock_users(&mut tx, &parties).await?;
        for id in parties {
            if !found.contains(&id) {
                return Err(HelpChainError::not_found("User", id));
            }
        }

        let busy = self.db.matches.live_participants(&mut tx, &parties).await?;
        if let Some(user_id) = busy.first() {
            return Err(HelpChainError::Conflict(format!(
                "user {} already holds a live payment match",
                user_id
            )));
        }

        let arranged = self.db.manual_matches.list_active_for_users(&mut tx, &parties).await?;
        if let Some(manual_match) = arranged.first() {
            return Err(HelpChainError::Conflict(format!(
                "user {} is bound by active manual match {}",
                manual_match.user_id, manual_match.id
            )));
        }

        for id in parties {
            if self.db.bans.find_active_for_user(&mut tx, id).await?.is_some() {
                return Err(HelpChainError::PreconditionFailed(format!("user {} is suspended", id)));
            }
        }

        let activity = self
            .db
            .activities
            .lock_by_id(&mut tx, command.help_activity_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("Help activity", command.help_activity_id))?;

        let (counterparty_id, counterpart_role, counterpart_owner) = match activity.role {
            HelpRole::Receiver if activity.owner_id == command.receiver_id => {
                (command.giver_id, HelpRole::Giver, command.giver_id)
            }
            HelpRole::Giver if activity.owner_id == command.giver_id => {
                (command.receiver_id, HelpRole::Receiver, command.receiver_id)
            }
            _ => {
                return Err(HelpChainError::PreconditionFailed(format!(
                    "activity {} does not belong to either party in the expected role",
                    activity.id
                )))
            }
        };

        if activity.status != HelpStatus::Pending {
            return Err(HelpChainError::Conflict(format!(
                "activity {} is {} and can no longer be matched",
                activity.id,
                activity.status.as_str()
            )));
        }

        let counterpart = self
            .db
            .activities
            .find_open(&mut tx, counterpart_owner, counterpart_role)
            .await?
            .filter(|a| a.status == HelpStatus::Pending);

        let now = self.clock.now();
        let deadline = now + self.payment_window();

        let payment_match = self
            .db
            .matches
            .insert(
                &mut tx,
                CreatePaymentMatchRequest {
                    giver_id: command.giver_id,
                    receiver_id: command.receiver_id,
                    help_activity_id: activity.id,
                    counterpart_activity_id: counterpart.as_ref().map(|a| a.id),
                    amount: command.amount,
                    payment_deadline: deadline,
                    matched_by: command.matched_by,
                    created_at: now,
                },
            )
            .await?;

        self.db
            .activities
            .mark_matched(&mut tx, activity.id, counterparty_id, now, deadline)
            .await?;
        if let Some(counterpart) = &counterpart {
            self.db
                .activities
                .mark_matched(&mut tx, counterpart.id, activity.owner_id, now, deadline)
                .await?;
        }

        tx.commit().await?;

        log_match_event(payment_match.id, "created", payment_match.giver_id, payment_match.receiver_id);
        Ok(payment_match)
    }

    /// Record an out-of-band counterparty for a user.
    ///
    /// The user leaves the automatic pools until the manual match is completed.
    pub async fn create_manual_match(
        &self,
        operator_user_id: i64,
        user_id: i64,
        role: HelpRole,
        amount: Decimal,
        counterparty: CounterpartyDetails,
    ) -> Result<ManualMatch> {
        let operator = self.auth.require_operator(operator_user_id)?;

        let request = CreateManualMatchRequest {
            user_id,
            role,
            amount,
            counterparty,
            created_by: operator.get(),
        }
        .validated()?;

        let mut tx = self.db.begin().await?;
        self.db.users.lock_user(&mut tx, user_id).await?;

        if !self.db.matches.live_participants(&mut tx, &[user_id]).await?.is_empty() {
            return Err(HelpChainError::Conflict(format!(
                "user {} already holds a live payment match",
                user_id
            )));
        }
        let arranged = self.db.manual_matches.list_active_for_users(&mut tx, &[user_id]).await?;
        if let Some(existing) = arranged.iter().find(|m| m.role == role) {
            return Err(HelpChainError::Conflict(format!(
                "user {} already has active {} manual match {}",
                user_id, role, existing.id
            )));
        }

        let manual_match = self.db.manual_matches.insert(&mut tx, request, self.clock.now()).await?;
        tx.commit().await?;

        log_operator_action(
            operator.get(),
            "create_manual_match",
            Some(&user_id.to_string()),
            Some(&format!("{} with {}", role, manual_match.matched_with_name)),
        );
        Ok(manual_match)
    }

    /// Close a manual match; repeated calls return the closed row
    pub async fn complete_manual_match(&self, operator_user_id: i64, manual_match_id: i64) -> Result<ManualMatch> {
        let operator = self.auth.require_operator(operator_user_id)?;

        let mut tx = self.db.begin().await?;
        let manual_match = self
            .db
            .manual_matches
            .lock_by_id(&mut tx, manual_match_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("Manual match", manual_match_id))?;

        if manual_match.status == ManualMatchStatus::Completed {
            return Ok(manual_match);
        }

        let manual_match = self
            .db
            .manual_matches
            .mark_completed(&mut tx, manual_match_id, self.clock.now())
            .await?;
        tx.commit().await?;

        log_operator_action(operator.get(), "complete_manual_match", Some(&manual_match_id.to_string()), None);
        Ok(manual_match)
    }

    /// Manual matches, optionally filtered by status
    pub async fn manual_matches(&self, status: Option<ManualMatchStatus>) -> Result<Vec<ManualMatch>> {
        self.db.manual_matches.list(status).await
    }
}
