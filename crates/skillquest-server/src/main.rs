//! SkillQuest server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `skillquest.yaml` (or `SKILLQUEST_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the configured store, migrating `PostgreSQL` when enabled
//! 4. Start the background deadline sweeper
//! 5. Serve the HTTP API until `Ctrl-C`

mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use skillquest_api::{AppState, spawn_sweeper, start_server};
use skillquest_db::{MemoryStore, PgStore, PostgresPool, Store};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LogFormat, LoggingConfig, StorageBackend};
use crate::error::ServerError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage or the HTTP server fails.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Logging is not up yet, so the config source is reported afterwards.
    let (config, source) = load_config()?;
    init_logging(&config.logging)?;

    info!(
        config = source,
        backend = ?config.storage.backend,
        host = config.server.host,
        port = config.server.port,
        "skillquest-server starting"
    );

    let store = open_store(&config).await?;
    let state = Arc::new(AppState::new(store));

    let sweeper = if config.maintenance.enabled {
        let every = config.maintenance.interval();
        info!(interval_secs = every.as_secs(), "Deadline sweeper enabled");
        Some(spawn_sweeper(Arc::clone(&state), every))
    } else {
        info!("Deadline sweeper disabled");
        None
    };

    let served = start_server(&config.server.to_server_config(), state).await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    served?;

    info!("skillquest-server shutdown complete");
    Ok(())
}

/// Load configuration from `SKILLQUEST_CONFIG` or `skillquest.yaml`.
///
/// A missing file falls back to defaults with environment overrides.
fn load_config() -> Result<(AppConfig, String), ServerError> {
    let path = std::env::var("SKILLQUEST_CONFIG")
        .map_or_else(|_| PathBuf::from("skillquest.yaml"), PathBuf::from);
    if path.exists() {
        let config = AppConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        let mut config = AppConfig::default();
        config.apply_env_overrides()?;
        Ok((config, String::from("defaults")))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(logging: &LoggingConfig) -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    installed.map_err(|e| ServerError::Logging {
        message: format!("{e}"),
    })
}

/// Build the configured store.
async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>, ServerError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = PostgresPool::connect(&config.database.to_postgres_config()).await?;
            info!(
                max_connections = config.database.max_connections,
                "PostgreSQL pool connected"
            );
            if config.database.run_migrations {
                pool.run_migrations().await?;
                info!("Migrations applied");
            }
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}
