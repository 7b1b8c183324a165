//! Services module
//!
//! This module contains the engine: each service exposes atomic operations
//! and owns its transaction boundaries.

pub mod auth;
pub mod ban;
pub mod clock;
pub mod collaborators;
pub mod deadline;
pub mod matching;
pub mod maturity;
pub mod obligation;
pub mod payout;
pub mod settlement;

// Re-export commonly used services
pub use auth::{AuthService, OperatorId};
pub use ban::BanService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{BanEventSink, PackageCatalog, TracingBanEventSink};
pub use deadline::{DeadlineMonitor, DeadlineStatus, MatchView};
pub use matching::{AutoMatchReport, Candidate, CreateMatchCommand, MatchingService, Pairing, SkippedPairing, select_pairs};
pub use maturity::MaturityService;
pub use obligation::ObligationService;
pub use payout::{LiveMatchState, PayoutService, UserPayoutState};
pub use settlement::SettlementService;

use std::sync::Arc;
use tracing::warn;
use crate::config::settings::Settings;
use crate::database::{health_check, DatabaseService, EngineStats};
use crate::utils::errors::Result;
use crate::utils::logging::log_operator_action;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub obligation_service: ObligationService,
    pub matching_service: MatchingService,
    pub settlement_service: SettlementService,
    pub deadline_monitor: DeadlineMonitor,
    pub maturity_service: MaturityService,
    pub ban_service: BanService,
    pub payout_service: PayoutService,
    pub auth_service: AuthService,
    db: DatabaseService,
    clock: Arc<dyn Clock>,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        db: DatabaseService,
        settings: &Settings,
        clock: Arc<dyn Clock>,
        ban_sink: Arc<dyn BanEventSink>,
    ) -> Self {
        let auth_service = AuthService::new(settings);
        let catalog: Arc<dyn PackageCatalog> = Arc::new(db.packages.clone());

        Self {
            obligation_service: ObligationService::new(db.clone(), catalog, clock.clone(), auth_service.clone()),
            matching_service: MatchingService::new(
                db.clone(),
                clock.clone(),
                settings.engine.clone(),
                auth_service.clone(),
            ),
            settlement_service: SettlementService::new(db.clone(), clock.clone(), auth_service.clone()),
            deadline_monitor: DeadlineMonitor::new(db.clone(), clock.clone()),
            maturity_service: MaturityService::new(db.clone(), clock.clone(), auth_service.clone()),
            ban_service: BanService::new(db.clone(), clock.clone(), auth_service.clone(), ban_sink),
            payout_service: PayoutService::new(db.clone(), clock.clone()),
            auth_service,
            db,
            clock,
        }
    }

    /// Production wiring: wall clock and log-only ban events
    pub fn with_defaults(db: DatabaseService, settings: &Settings) -> Self {
        Self::new(db, settings, Arc::new(SystemClock), Arc::new(TracingBanEventSink))
    }

    /// Delete a user and every dependent row in one transaction
    pub async fn purge_user(&self, operator_user_id: i64, user_id: i64) -> Result<u64> {
        let operator = self.auth_service.require_operator(operator_user_id)?;
        let removed = self.db.purge_user(user_id).await?;

        log_operator_action(
            operator.get(),
            "purge_user",
            Some(&user_id.to_string()),
            Some(&format!("{} rows removed", removed)),
        );
        Ok(removed)
    }

    /// Counters for the operator console
    pub async fn engine_stats(&self) -> Result<EngineStats> {
        self.db.stats(self.clock.now()).await
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = health_check(self.db.pool()).await.is_ok();
        if !database_healthy {
            warn!("Database health check failed");
        }

        ServiceHealthStatus {
            database_healthy,
            operators_configured: self.auth_service.operator_count() > 0,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub operators_configured: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy && self.operators_configured
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if !self.operators_configured {
            issues.push("No operators configured".to_string());
        }

        issues
    }
}
