//! Shared database utilities: pool construction and per-process handler state.
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::{Config, ConfigError};

/// Everything a handler invocation needs. Built once per cold start and
/// borrowed by every warm invocation that follows.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create database pool: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to apply migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl AppState {
    /// Loads `.env` when present, reads the configuration and opens the pool.
    /// Applies migrations when `RUN_MIGRATIONS` is set.
    pub async fn from_env() -> Result<Self, StartupError> {
        let _ = dotenvy::dotenv();
        let config = Config::from_env()?;
        let pool = connect(&config).await?;
        if config.run_migrations {
            run_migrations(&pool).await?;
            tracing::info!("migrations applied");
        }
        Ok(AppState { pool, config })
    }

    /// State whose pool only connects on first use
    pub fn lazy(config: Config) -> Result<Self, StartupError> {
        let pool = pool_options(&config).connect_lazy(&config.database_url)?;
        Ok(AppState { pool, config })
    }
}

fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
}

/// Opens the pool. Connections are checked out per statement or transaction and
/// go back to the pool when dropped, on every exit path.
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = pool_options(config).connect(&config.database_url).await?;
    tracing::info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

/// Applies the bundled schema migrations. sqlx holds an advisory lock while
/// migrating, so concurrent cold starts apply each migration once.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
