//! Utility functions for the CLI

use crate::error::{CliError, CliResult};
use anyhow::Context;
use colored::{ColoredString, Colorize};
use std::path::Path;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize tracing; `RUST_LOG` wins over the verbosity flag.
pub fn init_tracing(verbose: bool) -> CliResult<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(verbose)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CliError::General(format!("Failed to set tracing subscriber: {}", e)))?;

    Ok(())
}

/// Utility for colored console output
pub struct ColoredOutput;

impl ColoredOutput {
    pub fn success(msg: &str) -> ColoredString {
        msg.green().bold()
    }

    pub fn error(msg: &str) -> ColoredString {
        msg.red().bold()
    }
}

pub fn validate_file_exists(file_path: &str) -> CliResult<()> {
    if !Path::new(file_path).exists() {
        return Err(CliError::FileNotFound(file_path.to_string()));
    }
    Ok(())
}

/// Request configuration from inline JSON or a JSON/YAML file.
pub fn read_request_config(
    config_json: Option<String>,
    file: Option<String>,
) -> CliResult<serde_json::Value> {
    match (config_json, file) {
        (Some(inline), None) => serde_json::from_str(&inline)
            .map_err(|e| CliError::InvalidArgument(format!("Invalid JSON config: {}", e))),
        (None, Some(file_path)) => {
            validate_file_exists(&file_path)?;
            let content = std::fs::read_to_string(&file_path)
                .with_context(|| format!("Failed to read config file '{}'", file_path))?;

            if let Ok(json_data) = serde_json::from_str::<serde_json::Value>(&content) {
                Ok(json_data)
            } else {
                serde_yaml::from_str(&content).map_err(|e| {
                    CliError::InvalidArgument(format!(
                        "Invalid JSON/YAML config file '{}': {}",
                        file_path, e
                    ))
                })
            }
        }
        (None, None) => Err(CliError::InvalidArgument(
            "one of --config-json or --file is required".to_string(),
        )),
        (Some(_), Some(_)) => Err(CliError::InvalidArgument(
            "--config-json and --file are mutually exclusive".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_inline_config() {
        let value = read_request_config(Some(r#"{"url": "http://x"}"#.to_string()), None).unwrap();
        assert_eq!(value, json!({"url": "http://x"}));
    }

    #[test]
    fn test_yaml_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "method: post\nurl: http://x/y\ntimeout: 250").unwrap();

        let value =
            read_request_config(None, Some(file.path().to_str().unwrap().to_string())).unwrap();
        assert_eq!(value, json!({"method": "post", "url": "http://x/y", "timeout": 250}));
    }

    #[test]
    fn test_missing_inputs() {
        assert!(matches!(
            read_request_config(None, None),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            read_request_config(None, Some("/definitely/not/here.json".to_string())),
            Err(CliError::FileNotFound(_))
        ));
        assert!(matches!(
            read_request_config(Some("{".to_string()), None),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unreadable_config_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();

        match read_request_config(None, Some(path.clone())) {
            Err(CliError::General(message)) => {
                assert!(message.contains("Failed to read config file"));
                assert!(message.contains(&path));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
