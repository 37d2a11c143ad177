//! CLI type definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::run::RunArgs;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "brandscore")]
#[command(about = "Brandscore - agent orchestration and progressive brand scoring", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file to use instead of .brandscore/config.yaml
    #[arg(short, long, global = true, env = "BRANDSCORE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run an evaluation with simulated agents and wait until it settles
    Run(RunArgs),

    /// Show the status of an evaluation
    Status {
        /// Evaluation ID
        evaluation_id: String,
    },

    /// List the execution records of an evaluation
    Executions {
        /// Evaluation ID
        evaluation_id: String,
    },

    /// Show the agent registry
    Agents,

    /// Create or upgrade the execution database
    Migrate,

    /// Print the effective configuration
    Config,
}
