//! Migrate command - applies schema migrations against the configured database

use clap::Args;
use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::infrastructure::logging::{self, LoggingConfig};
use crate::infrastructure::storage::{self, PostgresMigrator, SqliteMigrator};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Revert the most recently applied migration instead
    #[arg(long)]
    pub revert: bool,
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&LoggingConfig::from(&config));

    let version = match config.storage.backend {
        StorageBackend::Memory => {
            anyhow::bail!(
                "The in-memory backend has no schema; set storage.backend to sqlite or postgres"
            )
        }
        StorageBackend::Sqlite => {
            let pool = storage::connect_sqlite(&config.storage).await?;

            if args.revert {
                report_revert(storage::revert_last_sqlite_migration(&pool).await?);
            } else {
                let applied = storage::run_sqlite_migrations(&pool).await?;
                info!(applied, "Migrations applied");
            }

            let version = SqliteMigrator::new(pool.clone()).current_version().await?;
            pool.close().await;
            version
        }
        StorageBackend::Postgres => {
            let pool = storage::connect_postgres(&config.storage).await?;

            if args.revert {
                report_revert(storage::revert_last_migration(&pool).await?);
            } else {
                let applied = storage::run_user_migrations(&pool).await?;
                info!(applied, "Migrations applied");
            }

            let version = PostgresMigrator::new(pool.clone()).current_version().await?;
            pool.close().await;
            version
        }
    };

    info!(version = ?version, "Current schema version");

    Ok(())
}

fn report_revert(reverted: Option<i64>) {
    match reverted {
        Some(version) => info!(version, "Reverted migration"),
        None => info!("No migrations to revert"),
    }
}
