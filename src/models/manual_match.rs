//! Manual match model
//!
//! Operator-authored pairing for a user whose counterparty is not a member.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use crate::models::help_activity::HelpRole;
use crate::utils::errors::{HelpChainError, Result};
use crate::utils::helpers::{is_valid_email, is_valid_phone, non_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "manual_match_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ManualMatchStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManualMatch {
    pub id: i64,
    pub user_id: i64,
    pub role: HelpRole,
    pub amount: Decimal,
    pub matched_with_name: String,
    pub matched_with_email: Option<String>,
    pub matched_with_phone: Option<String>,
    pub payment_account: Option<String>,
    pub payment_method: Option<String>,
    pub status: ManualMatchStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Out-of-band counterparty as entered by the operator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CounterpartyDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub payment_account: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateManualMatchRequest {
    pub user_id: i64,
    pub role: HelpRole,
    pub amount: Decimal,
    pub counterparty: CounterpartyDetails,
    pub created_by: i64,
}

impl CreateManualMatchRequest {
    /// Check the operator's input and normalize optional fields.
    ///
    /// Every offending field is reported at once.
    pub fn validated(mut self) -> Result<Self> {
        let mut fields = Vec::new();

        if self.amount <= Decimal::ZERO {
            fields.push("amount".to_string());
        }

        self.counterparty.name = non_blank(Some(self.counterparty.name)).unwrap_or_default();
        if self.counterparty.name.is_empty() {
            fields.push("matched_with_name".to_string());
        }

        self.counterparty.email = non_blank(self.counterparty.email.take());
        if let Some(email) = &self.counterparty.email {
            if !is_valid_email(email) {
                fields.push("matched_with_email".to_string());
            }
        }

        self.counterparty.phone = non_blank(self.counterparty.phone.take());
        if let Some(phone) = &self.counterparty.phone {
            if !is_valid_phone(phone) {
                fields.push("matched_with_phone".to_string());
            }
        }

        self.counterparty.payment_account = non_blank(self.counterparty.payment_account.take());
        self.counterparty.payment_method = non_blank(self.counterparty.payment_method.take());

        if fields.is_empty() {
            Ok(self)
        } else {
            Err(HelpChainError::Validation {
                fields,
                message: "manual match input is missing or malformed".to_string(),
            })
        }
    }
}
