//! Help activity model
//!
//! A help activity is a user's standing intent to give or to receive. The
//! table stores the owner, the role and an optional counterparty; the model
//! exposes that as the tagged [`HelpParties`] variant so that callers never
//! have to reason about which nullable columns are valid together.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "help_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HelpRole {
    Giver,
    Receiver,
}

impl HelpRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HelpRole::Giver => "giver",
            HelpRole::Receiver => "receiver",
        }
    }

    pub fn opposite(&self) -> HelpRole {
        match self {
            HelpRole::Giver => HelpRole::Receiver,
            HelpRole::Receiver => HelpRole::Giver,
        }
    }
}

impl std::fmt::Display for HelpRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "help_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HelpStatus {
    Pending,
    Matched,
    Active,
    Completed,
    Cancelled,
}

impl HelpStatus {
    /// Open activities count against the one-per-role limit
    pub fn is_open(&self) -> bool {
        matches!(self, HelpStatus::Pending | HelpStatus::Matched | HelpStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HelpStatus::Pending => "pending",
            HelpStatus::Matched => "matched",
            HelpStatus::Active => "active",
            HelpStatus::Completed => "completed",
            HelpStatus::Cancelled => "cancelled",
        }
    }
}

/// Who is involved in an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HelpParties {
    /// Standing offer to give, no receiver assigned yet
    Offer { giver_id: i64 },
    /// Standing request to receive, no giver assigned yet
    Request { receiver_id: i64 },
    /// Paired through a payment match
    Paired { giver_id: i64, receiver_id: i64 },
}

impl HelpParties {
    fn from_columns(owner_id: i64, role: HelpRole, counterparty_id: Option<i64>) -> Self {
        match (role, counterparty_id) {
            (HelpRole::Giver, None) => HelpParties::Offer { giver_id: owner_id },
            (HelpRole::Receiver, None) => HelpParties::Request { receiver_id: owner_id },
            (HelpRole::Giver, Some(receiver_id)) => HelpParties::Paired { giver_id: owner_id, receiver_id },
            (HelpRole::Receiver, Some(giver_id)) => HelpParties::Paired { giver_id, receiver_id: owner_id },
        }
    }

    pub fn giver_id(&self) -> Option<i64> {
        match self {
            HelpParties::Offer { giver_id } | HelpParties::Paired { giver_id, .. } => Some(*giver_id),
            HelpParties::Request { .. } => None,
        }
    }

    pub fn receiver_id(&self) -> Option<i64> {
        match self {
            HelpParties::Request { receiver_id } | HelpParties::Paired { receiver_id, .. } => Some(*receiver_id),
            HelpParties::Offer { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpActivity {
    pub id: i64,
    pub owner_id: i64,
    pub role: HelpRole,
    pub parties: HelpParties,
    pub package_id: i64,
    pub amount: Decimal,
    pub status: HelpStatus,
    pub admin_approved: bool,
    pub created_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
    pub maturity_date: Option<DateTime<Utc>>,
    pub payment_deadline: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for HelpActivity {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let owner_id: i64 = row.try_get("owner_id")?;
        let role: HelpRole = row.try_get("role")?;
        let counterparty_id: Option<i64> = row.try_get("counterparty_id")?;

        Ok(Self {
            id: row.try_get("id")?,
            owner_id,
            role,
            parties: HelpParties::from_columns(owner_id, role, counterparty_id),
            package_id: row.try_get("package_id")?,
            amount: row.try_get("amount")?,
            status: row.try_get("status")?,
            admin_approved: row.try_get("admin_approved")?,
            created_at: row.try_get("created_at")?,
            matched_at: row.try_get("matched_at")?,
            maturity_date: row.try_get("maturity_date")?,
            payment_deadline: row.try_get("payment_deadline")?,
        })
    }
}

impl HelpActivity {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }

    pub fn counterparty_id(&self) -> Option<i64> {
        match (self.role, self.parties) {
            (HelpRole::Giver, HelpParties::Paired { receiver_id, .. }) => Some(receiver_id),
            (HelpRole::Receiver, HelpParties::Paired { giver_id, .. }) => Some(giver_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHelpActivityRequest {
    pub owner_id: i64,
    pub role: HelpRole,
    pub package_id: i64,
    pub amount: Decimal,
}
