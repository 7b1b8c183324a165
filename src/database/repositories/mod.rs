//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod user;
pub mod package;
pub mod help_activity;
pub mod payment_match;
pub mod manual_match;
pub mod user_package;
pub mod banned_account;

// Re-export repositories
pub use user::UserRepository;
pub use package::PackageRepository;
pub use help_activity::HelpActivityRepository;
pub use payment_match::PaymentMatchRepository;
pub use manual_match::ManualMatchRepository;
pub use user_package::UserPackageRepository;
pub use banned_account::BannedAccountRepository;
