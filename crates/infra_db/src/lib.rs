//! PostgreSQL storage adapter
//!
//! Implements [`domain_ledger::LedgerStore`] on PostgreSQL using SQLx.
//! Each [`CommitSet`](domain_ledger::CommitSet) runs inside one SQL
//! transaction; the unique index on (company_id, kind, number) backs the
//! numbering guarantee, and version-guarded UPDATE/DELETE statements back
//! the optimistic concurrency scheme.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DbConfig, create_pool, PgLedgerStore};
//!
//! let config = DbConfig::from_env()?;
//! let pool = create_pool(&config).await?;
//! let store = PgLedgerStore::new(pool);
//! ```

pub mod config;
pub mod error;
pub mod pool;
pub mod store;

pub use config::DbConfig;
pub use pool::{create_pool, run_migrations, DatabasePool};
pub use store::PgLedgerStore;
