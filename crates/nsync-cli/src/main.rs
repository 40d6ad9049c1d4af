use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use nsync_config::{Config, ConfigError};

mod cli;
mod commands;
mod logging;
mod output;
mod workspace;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        // `init` creates the file it was pointed at.
        Err(ConfigError::NotFound(_)) if matches!(cli.command, cli::Command::Init(_)) => {
            let mut config = Config::default();
            config.apply_env(|key| std::env::var(key).ok());
            Ok(config)
        }
        other => other,
    };
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "warn".into());
    logging::init(cli.verbose, &level);

    let result = match config {
        Ok(config) => commands::run_command(cli, config).await,
        Err(err) => Err(err.into()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "✗".red().bold());
            ExitCode::FAILURE
        }
    }
}
