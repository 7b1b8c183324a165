//! Error handling for HelpChain
//!
//! This module defines the main error type used throughout the engine.
//! Business-rule violations are typed so that callers can branch their
//! user-facing messages on the specific kind; storage faults are wrapped
//! and propagated as internal errors.

use thiserror::Error;

/// Postgres SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Main error type for HelpChain
#[derive(Error, Debug)]
pub enum HelpChainError {
    #[error("Validation failed ({}): {message}", fields.join(", "))]
    Validation { fields: Vec<String>, message: String },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for HelpChain operations
pub type Result<T> = std::result::Result<T, HelpChainError>;

/// Caller-facing classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    PreconditionFailed,
    Conflict,
    NotFound,
    Unauthorized,
    Internal,
}

impl HelpChainError {
    /// Validation error for a single field
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        HelpChainError::Validation {
            fields: vec![field.to_string()],
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        HelpChainError::NotFound { entity, id }
    }

    /// Translate a unique-index violation into a `Conflict`, leave anything else untouched
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        let is_unique = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code == UNIQUE_VIOLATION)
            .unwrap_or(false);

        if is_unique {
            HelpChainError::Conflict(message.into())
        } else {
            HelpChainError::Database(err)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HelpChainError::Validation { .. } => ErrorKind::Validation,
            HelpChainError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            HelpChainError::Conflict(_) => ErrorKind::Conflict,
            HelpChainError::NotFound { .. } => ErrorKind::NotFound,
            HelpChainError::Unauthorized(_) => ErrorKind::Unauthorized,
            _ => ErrorKind::Internal,
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            HelpChainError::Validation { .. } => false,
            HelpChainError::PreconditionFailed(_) => false,
            // A concurrent writer got there first; re-reading and retrying is safe
            HelpChainError::Conflict(_) => true,
            HelpChainError::NotFound { .. } => false,
            HelpChainError::Unauthorized(_) => false,
            HelpChainError::Database(_) => true,
            HelpChainError::Migration(_) => false,
            HelpChainError::Config(_) => false,
            HelpChainError::ConfigLoad(_) => false,
            HelpChainError::Serialization(_) => false,
            HelpChainError::Io(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HelpChainError::Database(_) => ErrorSeverity::Critical,
            HelpChainError::Migration(_) => ErrorSeverity::Critical,
            HelpChainError::Config(_) => ErrorSeverity::Critical,
            HelpChainError::ConfigLoad(_) => ErrorSeverity::Critical,
            HelpChainError::Unauthorized(_) => ErrorSeverity::Warning,
            HelpChainError::Conflict(_) => ErrorSeverity::Warning,
            HelpChainError::Validation { .. } => ErrorSeverity::Info,
            HelpChainError::PreconditionFailed(_) => ErrorSeverity::Info,
            HelpChainError::NotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
