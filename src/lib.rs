// Account Rules - Core Library
// Plan limits, downgrade eligibility and yearly statistics for accounts.
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod rules;
pub mod statistics;

// Re-export commonly used types
pub use config::{AppConfig, DatabaseConfig, ServerConfig, SubscriptionConfig};
pub use db::{
    account_exists, insert_account, insert_activity, insert_call, insert_contact, insert_invitation,
    insert_subscription, insert_user, list_account_ids, load_account, open_connection,
    setup_database,
};
pub use entities::{Account, Activity, Call, Contact, Invitation, Subscription, User};
pub use rules::{AccountReport, AccountRules};
pub use statistics::{yearly_statistics, YearlyStatistics};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
