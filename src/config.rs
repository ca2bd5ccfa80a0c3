// ⚙️ Application Configuration - plan limits, database, server
//
// Layered with the `config` crate: built-in defaults, then optional
// `config/default` and `config/{RUN_MODE}` files, then environment
// variables prefixed with `ACCOUNT_RULES`
// (e.g. `ACCOUNT_RULES__SUBSCRIPTION__REQUIRES_SUBSCRIPTION=true`).

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub subscription: SubscriptionConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

/// Plan limits applied to accounts
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SubscriptionConfig {
    /// Whether this deployment charges for the paid version at all
    #[serde(default)]
    pub requires_subscription: bool,

    /// Maximum number of contacts on the free plan
    #[serde(default = "default_contact_limit")]
    pub number_of_allowed_contacts_free_account: usize,
}

fn default_contact_limit() -> usize {
    10
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            requires_subscription: false,
            number_of_allowed_contacts_free_account: default_contact_limit(),
        }
    }
}

/// SQLite database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "account_rules.db".to_string()
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl AppConfig {
    /// Load configuration from defaults, optional config files and environment
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("ACCOUNT_RULES")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("subscription.requires_subscription", false)?
            .set_default(
                "subscription.number_of_allowed_contacts_free_account",
                default_contact_limit() as i64,
            )?
            .set_default("database.path", default_database_path())?
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
