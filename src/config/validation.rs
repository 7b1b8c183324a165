//! Configuration validation module
//!
//! This module provides validation functions for engine configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{HelpChainError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_logging_config(&settings.logging)?;
    validate_engine_config(&settings.engine)?;
    validate_operator_config(&settings.operators)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(HelpChainError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(HelpChainError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(HelpChainError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    if config.acquire_timeout_seconds == 0 {
        return Err(HelpChainError::Config(
            "Acquire timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(HelpChainError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(HelpChainError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    if config.file_prefix.is_empty() {
        return Err(HelpChainError::Config(
            "Log file prefix is required".to_string()
        ));
    }

    Ok(())
}

/// Validate matching engine configuration
fn validate_engine_config(config: &super::EngineConfig) -> Result<()> {
    if config.payment_window_hours <= 0 {
        return Err(HelpChainError::Config(
            "Payment window must be a positive number of hours".to_string()
        ));
    }

    if config.auto_match_batch_limit <= 0 {
        return Err(HelpChainError::Config(
            "Auto-match batch limit must be greater than 0".to_string()
        ));
    }

    if config.overdue_scan_interval_seconds == 0 {
        return Err(HelpChainError::Config(
            "Overdue scan interval must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate operator configuration
fn validate_operator_config(config: &super::OperatorConfig) -> Result<()> {
    if config.ids.is_empty() {
        return Err(HelpChainError::Config(
            "At least one operator ID must be configured".to_string()
        ));
    }

    Ok(())
}
