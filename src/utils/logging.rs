//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the HelpChain engine.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log user actions with structured data
pub fn log_user_action(user_id: i64, action: &str, details: Option<&str>) {
    info!(
        user_id = user_id,
        action = action,
        details = details,
        "User action performed"
    );
}

/// Log operator actions
pub fn log_operator_action(operator_id: i64, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        operator_id = operator_id,
        action = action,
        target = target,
        details = details,
        "Operator action performed"
    );
}

/// Log payment match lifecycle events
pub fn log_match_event(match_id: i64, event: &str, giver_id: i64, receiver_id: i64) {
    info!(
        match_id = match_id,
        event = event,
        giver_id = giver_id,
        receiver_id = receiver_id,
        "Payment match event"
    );
}

/// Log ban ledger events
pub fn log_ban_event(user_id: i64, banned: bool, reason: Option<&str>) {
    if banned {
        warn!(user_id = user_id, reason = reason, "User banned");
    } else {
        info!(user_id = user_id, "User unbanned");
    }
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
