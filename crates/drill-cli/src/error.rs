//! CLI error types

use drill_core::DrillError;
use drill_types::TypeError;
use thiserror::Error;

/// Errors that stop the CLI before a summary can be reported
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No resource kinds selected; enable one in the configuration or pass --kind")]
    NoKinds,

    #[error("{0}")]
    Unsupported(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error(transparent)]
    Drill(#[from] DrillError),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<TypeError> for CliError {
    fn from(err: TypeError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Output(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Output(err.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;
