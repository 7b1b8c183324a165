//! Authorization service implementation
//!
//! Identity is verified by the authentication collaborator; this service only
//! decides whether a verified user may act as an operator.

use std::collections::HashSet;
use tracing::{debug, warn};
use crate::config::settings::Settings;
use crate::utils::errors::{HelpChainError, Result};

/// A caller proven to hold operator rights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorId(i64);

impl OperatorId {
    pub fn get(&self) -> i64 {
        self.0
    }
}

/// Authorization service for operator checks
#[derive(Clone, Debug)]
pub struct AuthService {
    operator_ids: HashSet<i64>,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(settings: &Settings) -> Self {
        Self {
            operator_ids: settings.operators.ids.iter().copied().collect(),
        }
    }

    /// Check if user is an operator
    pub fn is_operator(&self, user_id: i64) -> bool {
        self.operator_ids.contains(&user_id)
    }

    pub fn operator_count(&self) -> usize {
        self.operator_ids.len()
    }

    /// Require operator rights or return `Unauthorized`
    pub fn require_operator(&self, user_id: i64) -> Result<OperatorId> {
        if !self.is_operator(user_id) {
            warn!(user_id = user_id, "Operator action attempted by non-operator");
            return Err(HelpChainError::Unauthorized(format!(
                "user {} is not an operator",
                user_id
            )));
        }

        debug!(operator_id = user_id, "Operator authorized");
        Ok(OperatorId(user_id))
    }
}
