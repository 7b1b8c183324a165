//! Engine settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main engine configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub operators: OperatorConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub file_prefix: String,
    pub json: bool,
}

/// Matching and settlement tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Fixed payment window applied at match creation
    pub payment_window_hours: i64,
    /// Upper bound on receivers considered by one auto-match run
    pub auto_match_batch_limit: i64,
    pub overdue_scan_interval_seconds: u64,
}

/// Operator authorization
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperatorConfig {
    pub ids: Vec<i64>,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::builder(config::File::with_name("config").required(false))
    }

    /// Load settings from an explicit file, still honoring environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        Self::builder(config::File::from(path.as_ref()).required(true))
    }

    fn builder(file: config::File<config::FileSourceFile, config::FileFormat>) -> Result<Self, config::ConfigError> {
        let defaults = Settings::default();

        let settings = config::Config::builder()
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections)?
            .set_default("database.min_connections", defaults.database.min_connections)?
            .set_default("database.acquire_timeout_seconds", defaults.database.acquire_timeout_seconds)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.directory", defaults.logging.directory)?
            .set_default("logging.file_prefix", defaults.logging.file_prefix)?
            .set_default("logging.json", defaults.logging.json)?
            .set_default("engine.payment_window_hours", defaults.engine.payment_window_hours)?
            .set_default("engine.auto_match_batch_limit", defaults.engine.auto_match_batch_limit)?
            .set_default("engine.overdue_scan_interval_seconds", defaults.engine.overdue_scan_interval_seconds)?
            .set_default("operators.ids", Vec::<i64>::new())?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("HELPCHAIN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("operators.ids")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::HelpChainError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/helpchain".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                file_prefix: "helpchain.log".to_string(),
                json: false,
            },
            engine: EngineConfig {
                payment_window_hours: 6,
                auto_match_batch_limit: 500,
                overdue_scan_interval_seconds: 60,
            },
            operators: OperatorConfig { ids: vec![] },
        }
    }
}
