//! Issue one request through an engine instance and print the result

use crate::error::{CliError, CliResult};
use crate::utils::{read_request_config, validate_file_exists, ColoredOutput};
use anyhow::Context;
use rasphook_core::{RuntimeSettings, ScriptValue};
use rasphook_runtime::{EngineInstance, Settlement};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub config_json: Option<String>,
    pub file: Option<String>,
    pub data_file: Option<String>,
    pub wait_ms: u64,
    pub pretty: bool,
}

pub struct RequestCommand;

impl RequestCommand {
    pub fn run(settings: &RuntimeSettings, args: RequestArgs) -> CliResult<()> {
        let config = Self::prepare_config(&args)?;

        let mut engine = EngineInstance::with_reqwest(settings);
        let started = Instant::now();
        let deferred = engine.request(config)?;
        debug!("request dispatched, waiting up to {}ms", args.wait_ms);

        let idle = engine.run_until_idle(Duration::from_millis(args.wait_ms));
        let settlement = deferred.settlement();
        info!(
            settled = settlement.is_some(),
            idle,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request finished"
        );

        let Some(settlement) = settlement else {
            return Err(CliError::Unsettled(args.wait_ms));
        };

        println!("{}", Self::render(settlement.value(), args.pretty)?);

        match settlement {
            Settlement::Fulfilled(value) => {
                let status = value
                    .get("status")
                    .map(ScriptValue::to_display_string)
                    .unwrap_or_default();
                eprintln!("{} HTTP {}", ColoredOutput::success("Resolved:"), status);
                Ok(())
            }
            Settlement::Rejected(reason) => Err(Self::rejection(&reason)),
        }
    }

    /// Parse the configuration and attach `--data-file` as a binary body.
    pub fn prepare_config(args: &RequestArgs) -> CliResult<ScriptValue> {
        let json = read_request_config(args.config_json.clone(), args.file.clone())?;
        let mut config = ScriptValue::from(json);

        if let Some(path) = &args.data_file {
            validate_file_exists(path)?;
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read data file '{}'", path))?;
            match &mut config {
                ScriptValue::Object(map) => {
                    map.insert("data".to_string(), ScriptValue::Buffer(bytes));
                }
                _ => {
                    return Err(CliError::InvalidArgument(
                        "--data-file requires an object configuration".to_string(),
                    ))
                }
            }
        }

        Ok(config)
    }

    pub fn render(value: &ScriptValue, pretty: bool) -> CliResult<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(rendered)
    }

    fn rejection(reason: &ScriptValue) -> CliError {
        let error = reason.get("error");
        let code = error
            .and_then(|e| e.get("code"))
            .and_then(ScriptValue::as_int32)
            .map(i64::from)
            .unwrap_or(-1);
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(ScriptValue::as_str)
            .unwrap_or("unknown error")
            .to_string();
        CliError::RequestRejected { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(config_json: &str) -> RequestArgs {
        RequestArgs {
            config_json: Some(config_json.to_string()),
            file: None,
            data_file: None,
            wait_ms: 100,
            pretty: false,
        }
    }

    #[test]
    fn test_data_file_becomes_buffer() {
        let mut data = tempfile::NamedTempFile::new().unwrap();
        data.write_all(&[0xde, 0xad, 0xbe, 0xef]).unwrap();

        let mut request = args(r#"{"method": "put", "url": "http://x/blob"}"#);
        request.data_file = Some(data.path().to_str().unwrap().to_string());

        let config = RequestCommand::prepare_config(&request).unwrap();
        assert_eq!(
            config.get("data"),
            Some(&ScriptValue::Buffer(vec![0xde, 0xad, 0xbe, 0xef]))
        );
        assert_eq!(config.get("method"), Some(&ScriptValue::from("put")));
    }

    #[test]
    fn test_data_file_needs_object_config() {
        let data = tempfile::NamedTempFile::new().unwrap();
        let mut request = args(r#""http://x""#);
        request.data_file = Some(data.path().to_str().unwrap().to_string());

        assert!(matches!(
            RequestCommand::prepare_config(&request),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unreadable_data_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = args(r#"{"url": "http://x/blob"}"#);
        request.data_file = Some(dir.path().to_str().unwrap().to_string());

        match RequestCommand::prepare_config(&request) {
            Err(CliError::General(message)) => {
                assert!(message.contains("Failed to read data file"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejection_reason() {
        let reason = ScriptValue::object([
            ("config", ScriptValue::Null),
            (
                "error",
                ScriptValue::object([
                    ("code", ScriptValue::from(3)),
                    ("message", ScriptValue::from("no such host")),
                ]),
            ),
        ]);

        match RequestCommand::rejection(&reason) {
            CliError::RequestRejected { code, message } => {
                assert_eq!(code, 3);
                assert_eq!(message, "no such host");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_render_omits_undefined() {
        let value = ScriptValue::object([
            ("status", ScriptValue::from(200)),
            ("missing", ScriptValue::Undefined),
        ]);
        assert_eq!(RequestCommand::render(&value, false).unwrap(), r#"{"status":200}"#);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let request = RequestArgs {
            wait_ms: 5_000,
            ..args(r#"{"url": "not a url"}"#)
        };
        let err = RequestCommand::run(&RuntimeSettings::default(), request).unwrap_err();
        assert!(matches!(err, CliError::RequestRejected { code: 5, .. }));
    }
}
