//! Database connection pools and schema migrations

pub mod migrations;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::StorageConfig;
use crate::domain::DomainError;

pub use migrations::{
    revert_last_migration, revert_last_sqlite_migration, run_sqlite_migrations,
    run_user_migrations, Migration, PostgresMigrator, SqliteMigrator,
};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection pool for the configured PostgreSQL database
pub async fn connect_postgres(config: &StorageConfig) -> Result<PgPool, DomainError> {
    info!(max_connections = config.max_connections, "Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.connection_url())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

    info!("PostgreSQL connection established");

    Ok(pool)
}

/// Open the SQLite database file at `config.path`, creating it when missing
pub async fn connect_sqlite(config: &StorageConfig) -> Result<SqlitePool, DomainError> {
    info!(path = %config.path, "Opening SQLite database...");

    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to open SQLite database: {}", e)))?;

    info!("SQLite database ready");

    Ok(pool)
}

/// Single-connection pool over a private in-memory SQLite database
#[cfg(test)]
pub(crate) async fn memory_sqlite_pool() -> Result<SqlitePool, DomainError> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| DomainError::storage(format!("Failed to open SQLite database: {}", e)))
}
