//! Deadline monitor
//!
//! Read-side only. The payment deadline is fixed when a match is created;
//! "overdue" is derived from it at read time and never triggers any action.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use crate::database::DatabaseService;
use crate::models::payment_match::PaymentMatch;
use crate::services::clock::Clock;
use crate::utils::errors::{HelpChainError, Result};
use crate::utils::helpers::format_time_remaining;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineStatus {
    pub deadline: DateTime<Utc>,
    /// Negative once the deadline has passed
    #[serde(with = "duration_seconds")]
    pub time_remaining: Duration,
    pub overdue: bool,
}

impl DeadlineStatus {
    pub fn of(payment_match: &PaymentMatch, now: DateTime<Utc>) -> Self {
        let time_remaining = payment_match.payment_deadline - now;
        Self {
            deadline: payment_match.payment_deadline,
            time_remaining,
            overdue: payment_match.status.is_live() && time_remaining < Duration::zero(),
        }
    }

    pub fn describe(&self) -> String {
        format_time_remaining(self.time_remaining)
    }
}

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::seconds(i64::deserialize(deserializer)?))
    }
}

/// A match together with its deadline as seen at read time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    #[serde(flatten)]
    pub payment_match: PaymentMatch,
    pub deadline_status: DeadlineStatus,
}

#[derive(Clone)]
pub struct DeadlineMonitor {
    db: DatabaseService,
    clock: Arc<dyn Clock>,
}

impl DeadlineMonitor {
    pub fn new(db: DatabaseService, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn view(&self, payment_match: PaymentMatch, now: DateTime<Utc>) -> MatchView {
        let deadline_status = DeadlineStatus::of(&payment_match, now);
        MatchView { payment_match, deadline_status }
    }

    /// Deadline status of one match
    pub async fn match_status(&self, match_id: i64) -> Result<MatchView> {
        let payment_match = self
            .db
            .matches
            .find_by_id(match_id)
            .await?
            .ok_or_else(|| HelpChainError::not_found("Payment match", match_id))?;
        Ok(self.view(payment_match, self.clock.now()))
    }

    /// Live matches, earliest deadline first
    pub async fn active_matches(&self) -> Result<Vec<MatchView>> {
        let now = self.clock.now();
        let matches = self.db.matches.list_live().await?;
        Ok(matches.into_iter().map(|m| self.view(m, now)).collect())
    }

    /// Live matches past their deadline
    pub async fn overdue_matches(&self) -> Result<Vec<MatchView>> {
        let now = self.clock.now();
        let matches = self.db.matches.list_overdue(now).await?;
        debug!(count = matches.len(), "Loaded overdue matches");
        Ok(matches.into_iter().map(|m| self.view(m, now)).collect())
    }
}
