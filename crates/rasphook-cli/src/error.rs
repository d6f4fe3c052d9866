//! Error types for the CLI

use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Settings error: {0}")]
    Settings(#[from] rasphook_core::CoreError),

    #[error("{0}")]
    Runtime(#[from] rasphook_runtime::RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Request rejected (code {code}): {message}")]
    RequestRejected { code: i64, message: String },

    #[error("Request did not settle within {0}ms")]
    Unsettled(u64),

    #[error("General error: {0}")]
    General(String),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::General(format!("{:#}", err))
    }
}

pub type CliResult<T> = Result<T, CliError>;
