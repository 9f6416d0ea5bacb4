//! Configuration for the telemetry pipeline
//!
//! Sinks are constructed from explicit configuration at startup; nothing is
//! read from ambient global state at record time.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, TelemetryError};
use crate::jsonl_sink::{DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES};

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Path of the active JSON Lines log file.
    pub log_path: PathBuf,

    /// Rotation threshold in bytes.
    pub max_bytes: u64,

    /// Number of rotated files retained.
    pub backup_count: usize,

    /// Whether to attach a console sink.
    pub console: bool,

    /// Model identifier stamped on records when none is given per call.
    pub default_model: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("llm_calls.jsonl"),
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
            console: true,
            default_model: "mock-llama3.2".to_string(),
        }
    }
}

impl RecorderConfig {
    pub fn builder() -> RecorderConfigBuilder {
        RecorderConfigBuilder::new()
    }

    /// Checks the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_bytes == 0 {
            return Err(TelemetryError::InvalidConfig {
                message: "max_bytes must be greater than zero".to_string(),
            });
        }
        if self.default_model.is_empty() {
            return Err(TelemetryError::InvalidConfig {
                message: "default_model must be non-empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration builder
pub struct RecorderConfigBuilder {
    config: RecorderConfig,
}

impl Default for RecorderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RecorderConfig::default(),
        }
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.config.max_bytes = max_bytes;
        self
    }

    pub fn backup_count(mut self, backup_count: usize) -> Self {
        self.config.backup_count = backup_count;
        self
    }

    pub fn console(mut self, enabled: bool) -> Self {
        self.config.console = enabled;
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    pub fn build(self) -> RecorderConfig {
        self.config
    }
}

/// Load configuration from environment variables
pub fn from_env() -> RecorderConfig {
    let mut config = RecorderConfig::default();

    if let Ok(path) = std::env::var("LLM_TELEMETRY_LOG_PATH") {
        config.log_path = PathBuf::from(path);
    }

    if let Ok(max_bytes) = std::env::var("LLM_TELEMETRY_MAX_BYTES") {
        if let Ok(parsed) = max_bytes.parse::<u64>() {
            config.max_bytes = parsed;
        }
    }

    if let Ok(backups) = std::env::var("LLM_TELEMETRY_BACKUPS") {
        if let Ok(parsed) = backups.parse::<usize>() {
            config.backup_count = parsed;
        }
    }

    if let Ok(console) = std::env::var("LLM_TELEMETRY_CONSOLE") {
        config.console = console.to_lowercase() == "true" || console == "1";
    }

    if let Ok(model) = std::env::var("LLM_TELEMETRY_MODEL") {
        config.default_model = model;
    }

    config
}

/// Load configuration from a TOML file
pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<RecorderConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: RecorderConfig =
        toml::from_str(&contents).map_err(|e| TelemetryError::InvalidConfig {
            message: e.to_string(),
        })?;
    Ok(config)
}
