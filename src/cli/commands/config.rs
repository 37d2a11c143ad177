//! `brandscore config`

use anyhow::{Context, Result};

use crate::domain::models::Config;

pub fn execute(config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", serde_yaml::to_string(config).context("Failed to render config")?);
    }
    Ok(())
}
