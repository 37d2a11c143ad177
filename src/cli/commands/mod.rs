//! Subcommand implementations.

pub mod agents;
pub mod config;
pub mod executions;
pub mod migrate;
pub mod run;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteExecutionRepository};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::services::ExecutionTracker;

/// Load config from an explicit file or the project hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Tracker over the configured SQLite database, migrated on open.
pub async fn open_tracker(config: &Config) -> Result<ExecutionTracker> {
    let url = config.database.url();
    let pool = initialize_database(
        &url,
        Some(PoolConfig::default().with_max_connections(config.database.max_connections)),
    )
    .await
    .with_context(|| format!("Failed to open execution database at {url}"))?;
    Ok(ExecutionTracker::new(Arc::new(SqliteExecutionRepository::new(pool))))
}
