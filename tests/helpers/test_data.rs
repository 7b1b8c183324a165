//! Fixture builders

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Mutex;
use HelpChain::models::BanEvent;
use HelpChain::services::BanEventSink;
use HelpChain::Result;

/// Operator id configured for every test context
pub const OPERATOR_ID: i64 = 9_000;

/// Fixed starting instant; whole seconds so timestamps survive a round trip
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn dollars(amount: i64) -> Decimal {
    Decimal::from(amount)
}

/// Ban sink that keeps every event for later assertions
#[derive(Debug, Default)]
pub struct RecordingBanSink {
    events: Mutex<Vec<BanEvent>>,
}

impl RecordingBanSink {
    pub fn events(&self) -> Vec<BanEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl BanEventSink for RecordingBanSink {
    async fn publish(&self, event: &BanEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
