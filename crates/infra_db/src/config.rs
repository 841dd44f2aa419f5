//! Database configuration

use serde::Deserialize;

/// Database configuration, loaded from `LEDGER_`-prefixed environment
/// variables (e.g. `LEDGER_DATABASE_URL`).
///
/// The connection string is required; pool tuning falls back to defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections kept open
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl DbConfig {
    /// Loads configuration from the environment, reading a `.env` file
    /// first when one is present. Fails when `LEDGER_DATABASE_URL` is
    /// not set.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        config::Config::builder()
            .add_source(config::Environment::with_prefix("LEDGER"))
            .build()?
            .try_deserialize()
    }
}
