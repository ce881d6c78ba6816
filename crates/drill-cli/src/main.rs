//! Drill CLI - Restore drills for backed-up infrastructure
//!
//! This CLI lets operators:
//! - Restore the latest backup of each resource kind into a test resource
//! - Wait for it to become ready and sanity-check it
//! - Report the measured RTO per kind, with pass/fail as the exit status
//!
//! Restored resources are tagged as disposable test resources and are never
//! deleted by drill.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;

use commands::run::{self, RunArgs};
use config::DrillConfig;
use error::CliResult;

/// Exit status for errors that prevented a summary
const EXIT_ERROR: u8 = 2;

/// Drill CLI application
#[derive(Parser)]
#[command(name = "drill")]
#[command(about = "Drill - verify that backups restore within their RTO", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DRILL_CONFIG")]
    config: Option<String>,

    /// Log level, overrides the configured one
    #[arg(long, env = "DRILL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "DRILL_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run a restore drill
    Run(RunArgs),

    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match DrillConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    init_tracing(
        cli.log_level.as_deref().unwrap_or(&config.logging.level),
        cli.log_json || config.logging.json,
    );

    match execute(cli.command, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "Drill aborted");
            output::print_error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Initialize tracing; logs go to stderr so stdout carries only the report
fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn execute(command: Commands, config: &DrillConfig) -> CliResult<u8> {
    match command {
        Commands::Run(args) => run::execute(args, config).await,
        Commands::Config => {
            print!("{}", serde_yaml::to_string(config)?);
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use drill_types::ResourceKind;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "drill", "run", "--kind", "rds", "-k", "volume", "--output", "json", "--simulate",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.kinds, vec![ResourceKind::Database, ResourceKind::Volume]);
                assert_eq!(args.output, output::OutputFormat::Json);
                assert!(args.simulate);
            }
            Commands::Config => panic!("expected run"),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Cli::try_parse_from(["drill", "run", "--kind", "queue"]).is_err());
    }
}
