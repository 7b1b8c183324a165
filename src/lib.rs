//! HelpChain matching and settlement engine
//!
//! Members register standing offers to give and requests to receive; the
//! engine pairs them into payment matches with a fixed payment window,
//! tracks confirmations through settlement, and keeps the operator-side
//! ledgers for bans, manual matches and package maturity.

#![allow(non_snake_case)]

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{HelpChainError, ErrorKind, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
