//! `brandscore migrate`

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::sqlite::{initialize_database, Migrator, PoolConfig};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
pub struct MigrateOutput {
    pub database: String,
    pub schema_version: i64,
}

impl CommandOutput for MigrateOutput {
    fn to_human(&self) -> String {
        format!("Database {} is at schema version {}", self.database, self.schema_version)
    }
}

pub async fn execute(config: &Config, json: bool) -> Result<()> {
    let url = config.database.url();
    let pool = initialize_database(
        &url,
        Some(PoolConfig::default().with_max_connections(config.database.max_connections)),
    )
    .await
    .with_context(|| format!("Failed to migrate {url}"))?;

    let schema_version = Migrator::new(pool.clone()).get_current_version().await?;
    pool.close().await;

    output(
        &MigrateOutput {
            database: config.database.path.clone(),
            schema_version,
        },
        json,
    );
    Ok(())
}
