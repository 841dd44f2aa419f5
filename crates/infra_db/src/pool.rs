//! Connection pool management

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use domain_ledger::StoreError;

use crate::config::DbConfig;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// Creates a connection pool from the given configuration
pub async fn create_pool(config: &DbConfig) -> Result<DatabasePool, StoreError> {
    info!(
        max_connections = config.max_connections,
        "connecting to database"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
}

/// Runs pending migrations from the crate's `migrations/` directory
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    info!("migrations applied");
    Ok(())
}
