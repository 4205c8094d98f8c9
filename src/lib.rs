//! User Registry
//!
//! A small HTTP service that registers users and lets them change their
//! username and email, with:
//! - Validation owned by the user entity
//! - Uniqueness enforced by the store (SQLite, PostgreSQL or in-memory)
//! - Optimistic versioning so concurrent updates cannot silently overwrite

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::{AppState, UserServiceTrait};
use config::StorageBackend;
use infrastructure::storage;
use infrastructure::user::{
    InMemoryUserRepository, PostgresUserRepository, SqliteUserRepository, UserService,
};

/// Create the application state with in-memory storage and default settings
pub async fn create_app_state() -> anyhow::Result<AppState> {
    let mut config = AppConfig::default();
    config.storage.backend = StorageBackend::Memory;

    create_app_state_with_config(&config).await
}

/// Create the application state for the configured storage backend.
///
/// With a database backend, pending migrations run first unless disabled.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    info!(backend = ?config.storage.backend, "Storage backend selected");

    let user_service: Arc<dyn UserServiceTrait> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory user storage");
            Arc::new(UserService::new(Arc::new(InMemoryUserRepository::new())))
        }
        StorageBackend::Sqlite => {
            let pool = storage::connect_sqlite(&config.storage).await?;

            if config.storage.run_migrations {
                let applied = storage::run_sqlite_migrations(&pool).await?;
                info!(applied, "Database migrations complete");
            }

            info!(path = %config.storage.path, "Using SQLite user storage");
            Arc::new(UserService::new(Arc::new(SqliteUserRepository::new(pool))))
        }
        StorageBackend::Postgres => {
            let pool = storage::connect_postgres(&config.storage).await?;

            if config.storage.run_migrations {
                let applied = storage::run_user_migrations(&pool).await?;
                info!(applied, "Database migrations complete");
            }

            info!("Using PostgreSQL user storage");
            Arc::new(UserService::new(Arc::new(PostgresUserRepository::new(pool))))
        }
    };

    Ok(AppState::new(user_service, config.api.error_mode))
}
