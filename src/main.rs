//! Brandscore CLI entry point.

use clap::Parser;

use brandscore::cli::commands::{self, load_config};
use brandscore::cli::{handle_error, Cli, Commands};
use brandscore::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    // Console logs are muted in JSON mode; file logging is unaffected.
    let mut log_config = LogConfig::from_settings(&config.logging);
    log_config.enable_stdout = !cli.json;
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, &config, cli.json).await,
        Commands::Status { evaluation_id } => commands::status::execute(evaluation_id, &config, cli.json).await,
        Commands::Executions { evaluation_id } => {
            commands::executions::execute(evaluation_id, &config, cli.json).await
        }
        Commands::Agents => commands::agents::execute(&config, cli.json),
        Commands::Migrate => commands::migrate::execute(&config, cli.json).await,
        Commands::Config => commands::config::execute(&config, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
