//! Collaborator seams
//!
//! The engine reads package amounts from the catalog and hands ban events to
//! the access-control side; both are traits so hosts can plug their own.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};
use crate::database::repositories::PackageRepository;
use crate::models::BanEvent;
use crate::utils::errors::Result;

/// Package id to amount lookup
#[async_trait]
pub trait PackageCatalog: Send + Sync {
    async fn amount_of(&self, package_id: i64) -> Result<Option<Decimal>>;
}

#[async_trait]
impl PackageCatalog for PackageRepository {
    async fn amount_of(&self, package_id: i64) -> Result<Option<Decimal>> {
        Ok(self.find_by_id(package_id).await?.map(|p| p.amount))
    }
}

/// Receives ban ledger changes after they commit
#[async_trait]
pub trait BanEventSink: Send + Sync {
    async fn publish(&self, event: &BanEvent) -> Result<()>;
}

/// Default sink: records the event in the structured log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBanEventSink;

#[async_trait]
impl BanEventSink for TracingBanEventSink {
    async fn publish(&self, event: &BanEvent) -> Result<()> {
        match event {
            BanEvent::Banned { ban_id, user_id, reason, banned_by, .. } => {
                warn!(ban_id = ban_id, user_id = user_id, banned_by = banned_by, reason = %reason, "Ban event emitted; access should be revoked");
            }
            BanEvent::Unbanned { ban_id, user_id, unbanned_by, .. } => {
                info!(ban_id = ban_id, user_id = user_id, unbanned_by = unbanned_by, "Unban event emitted; access may be restored");
            }
        }
        Ok(())
    }
}
