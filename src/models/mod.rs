//! Data models module
//!
//! This module contains all data structures used by the engine, together with
//! the pure state-transition rules that the services apply inside transactions.

pub mod user;
pub mod help_activity;
pub mod payment_match;
pub mod manual_match;
pub mod user_package;
pub mod banned_account;

// Re-export commonly used models
pub use user::{User, Package, CreateUserRequest};
pub use help_activity::{HelpActivity, HelpParties, HelpRole, HelpStatus, CreateHelpActivityRequest};
pub use payment_match::{PaymentMatch, MatchStatus, MatchedBy, Transition, CreatePaymentMatchRequest};
pub use manual_match::{ManualMatch, ManualMatchStatus, CounterpartyDetails, CreateManualMatchRequest};
pub use user_package::{UserPackage, PackageStatus};
pub use banned_account::{BannedAccount, BanEvent, CreateBanRequest};
