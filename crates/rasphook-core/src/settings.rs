//! Runtime settings shared by every engine instance in the host process.
//!
//! Settings come from, in increasing priority: built-in defaults, an optional
//! YAML or JSON file, and `RASPHOOK_*` environment variables.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ENV_PREFIX: &str = "RASPHOOK_";

/// Supported file formats for settings files
#[derive(Debug, Clone, PartialEq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Detect file format from extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            Some("json") => Ok(FileFormat::Json),
            Some(ext) => Err(CoreError::UnsupportedFormat(ext.to_string())),
            None => Err(CoreError::UnsupportedFormat("no extension".to_string())),
        }
    }
}

/// Defaults for fields a script leaves out of its request configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub max_redirects: u32,
    /// Total time budget for one request; 0 disables the limit
    pub timeout_ms: u64,
    /// Time budget for establishing the connection; 0 disables the limit
    pub connect_timeout_ms: u64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            max_redirects: 3,
            timeout_ms: 1_000,
            connect_timeout_ms: 500,
        }
    }
}

/// Background worker thread settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Worker threads are named `<prefix>-<job id>`
    pub thread_name_prefix: String,
    /// Stack size for worker threads; the platform default when unset
    pub stack_size: Option<usize>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            thread_name_prefix: "rasphook-job".to_string(),
            stack_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisposalSettings {
    /// Interval between warnings while disposal waits on outstanding jobs
    pub warn_after_ms: u64,
}

impl Default for DisposalSettings {
    fn default() -> Self {
        Self {
            warn_after_ms: 5_000,
        }
    }
}

impl DisposalSettings {
    pub fn warn_after(&self) -> Duration {
        Duration::from_millis(self.warn_after_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub request: RequestDefaults,
    pub worker: WorkerSettings,
    pub disposal: DisposalSettings,
}

impl RuntimeSettings {
    pub fn validate(&self) -> CoreResult<()> {
        if self.worker.thread_name_prefix.trim().is_empty() {
            return Err(CoreError::invalid_setting(
                "worker.thread_name_prefix",
                "must not be empty",
            ));
        }
        if self.worker.thread_name_prefix.contains('\0') {
            return Err(CoreError::invalid_setting(
                "worker.thread_name_prefix",
                "must not contain NUL bytes",
            ));
        }
        if self.disposal.warn_after_ms == 0 {
            return Err(CoreError::invalid_setting(
                "disposal.warn_after_ms",
                "must be greater than 0",
            ));
        }
        if matches!(self.worker.stack_size, Some(size) if size < 64 * 1024) {
            return Err(CoreError::invalid_setting(
                "worker.stack_size",
                "must be at least 65536 bytes",
            ));
        }
        Ok(())
    }
}

/// Loads [`RuntimeSettings`] from files and the environment.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    env_prefix: String,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: prefix.into(),
        }
    }

    /// Defaults or the given file, then environment overrides, then validation.
    pub fn load(&self, path: Option<&Path>) -> CoreResult<RuntimeSettings> {
        let mut settings = match path {
            Some(path) => self.read_file(path)?,
            None => RuntimeSettings::default(),
        };
        self.apply_overrides(&mut settings, |key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a settings file without consulting the environment.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> CoreResult<RuntimeSettings> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let format = FileFormat::from_path(path)?;
        self.parse_content(&content, format)
    }

    pub fn parse_content(&self, content: &str, format: FileFormat) -> CoreResult<RuntimeSettings> {
        let settings = match format {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        };
        Ok(settings)
    }

    /// Apply `<prefix>*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&self, settings: &mut RuntimeSettings, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{}{}", self.env_prefix, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = var("MAX_REDIRECTS") {
            settings.request.max_redirects = parse_override(&key, &value)?;
        }
        if let Some((key, value)) = var("TIMEOUT_MS") {
            settings.request.timeout_ms = parse_override(&key, &value)?;
        }
        if let Some((key, value)) = var("CONNECT_TIMEOUT_MS") {
            settings.request.connect_timeout_ms = parse_override(&key, &value)?;
        }
        if let Some((_, value)) = var("WORKER_THREAD_PREFIX") {
            settings.worker.thread_name_prefix = value;
        }
        if let Some((key, value)) = var("WORKER_STACK_SIZE") {
            settings.worker.stack_size = Some(parse_override(&key, &value)?);
        }
        if let Some((key, value)) = var("DISPOSAL_WARN_AFTER_MS") {
            settings.disposal.warn_after_ms = parse_override(&key, &value)?;
        }
        Ok(())
    }
}

fn parse_override<T>(key: &str, value: &str) -> CoreResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| CoreError::invalid_setting(key, format!("'{}': {}", value, e)))
}
