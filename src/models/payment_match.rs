//! Payment match model and settlement transitions

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use crate::utils::errors::{HelpChainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    AwaitingConfirmation,
    Completed,
}

/// Outcome of applying a settlement signal to a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The match moves to the given status
    Advance(MatchStatus),
    /// The signal was already applied; the match is left as it is
    AlreadyApplied,
}

impl MatchStatus {
    /// A live match still binds both parties
    pub fn is_live(&self) -> bool {
        !matches!(self, MatchStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::AwaitingConfirmation => "awaiting_confirmation",
            MatchStatus::Completed => "completed",
        }
    }

    /// Giver reports the payment as sent
    pub fn confirm_sent(self) -> Transition {
        match self {
            MatchStatus::Pending => Transition::Advance(MatchStatus::AwaitingConfirmation),
            MatchStatus::AwaitingConfirmation | MatchStatus::Completed => Transition::AlreadyApplied,
        }
    }

    /// Receiver or operator confirms the payment arrived
    pub fn confirm_received(self) -> Result<Transition> {
        match self {
            MatchStatus::Pending => Err(HelpChainError::PreconditionFailed(
                "the giver has not confirmed sending the payment yet".to_string(),
            )),
            MatchStatus::AwaitingConfirmation => Ok(Transition::Advance(MatchStatus::Completed)),
            MatchStatus::Completed => Ok(Transition::AlreadyApplied),
        }
    }
}

/// Who created a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    Auto,
    Operator(i64),
}

impl MatchedBy {
    fn from_column(operator_id: Option<i64>) -> Self {
        operator_id.map(MatchedBy::Operator).unwrap_or(MatchedBy::Auto)
    }

    pub fn operator_id(&self) -> Option<i64> {
        match self {
            MatchedBy::Auto => None,
            MatchedBy::Operator(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedBy::Auto => write!(f, "auto"),
            MatchedBy::Operator(id) => write!(f, "operator:{}", id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentMatch {
    pub id: i64,
    pub giver_id: i64,
    pub receiver_id: i64,
    /// The activity this match was created for
    pub help_activity_id: i64,
    /// The other party's pending activity, when it had one
    pub counterpart_activity_id: Option<i64>,
    pub amount: Decimal,
    pub payment_deadline: DateTime<Utc>,
    pub status: MatchStatus,
    pub matched_by_operator: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentMatch {
    pub fn matched_by(&self) -> MatchedBy {
        MatchedBy::from_column(self.matched_by_operator)
    }

    pub fn involves(&self, user_id: i64) -> bool {
        self.giver_id == user_id || self.receiver_id == user_id
    }

    /// The other party, from `user_id`'s point of view
    pub fn counterparty_of(&self, user_id: i64) -> Option<i64> {
        if self.giver_id == user_id {
            Some(self.receiver_id)
        } else if self.receiver_id == user_id {
            Some(self.giver_id)
        } else {
            None
        }
    }

    pub fn activity_ids(&self) -> Vec<i64> {
        let mut ids = vec![self.help_activity_id];
        ids.extend(self.counterpart_activity_id);
        ids
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentMatchRequest {
    pub giver_id: i64,
    pub receiver_id: i64,
    pub help_activity_id: i64,
    pub counterpart_activity_id: Option<i64>,
    pub amount: Decimal,
    pub payment_deadline: DateTime<Utc>,
    pub matched_by: MatchedBy,
    pub created_at: DateTime<Utc>,
}
