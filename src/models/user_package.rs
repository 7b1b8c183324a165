//! User package model and maturity rules

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{HelpChainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "package_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Pending,
    Active,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserPackage {
    pub id: i64,
    pub user_id: i64,
    pub package_id: i64,
    pub status: PackageStatus,
    pub admin_approved: bool,
    pub maturity_date: Option<DateTime<Utc>>,
    pub extended_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPackage {
    pub fn check_approve(&self, maturity_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        if self.admin_approved {
            return Err(HelpChainError::PreconditionFailed(format!(
                "user package {} is already approved",
                self.id
            )));
        }
        if maturity_date <= now {
            return Err(HelpChainError::invalid(
                "maturity_date",
                "maturity date must be in the future",
            ));
        }
        Ok(())
    }

    pub fn check_reject(&self) -> Result<()> {
        if self.admin_approved {
            return Err(HelpChainError::PreconditionFailed(format!(
                "user package {} is already approved and cannot be rejected",
                self.id
            )));
        }
        Ok(())
    }

    pub fn check_extend(&self, new_maturity_date: DateTime<Utc>) -> Result<()> {
        let current = match (self.admin_approved, self.maturity_date) {
            (true, Some(current)) => current,
            _ => {
                return Err(HelpChainError::PreconditionFailed(format!(
                    "user package {} must be approved before it can be extended",
                    self.id
                )))
            }
        };
        if new_maturity_date <= current {
            return Err(HelpChainError::invalid(
                "new_maturity_date",
                "an extension must move the maturity date later",
            ));
        }
        Ok(())
    }

    /// Approved and past its maturity date
    pub fn is_matured(&self, now: DateTime<Utc>) -> bool {
        self.admin_approved && self.maturity_date.map(|d| d <= now).unwrap_or(false)
    }
}
