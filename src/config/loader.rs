// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::DEFAULT_LOG_FILTER;
use crate::errors::ConfigError;
use crate::transform::TransformOptions;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Runtime configuration for networks built by the binary and by embedders.
///
/// Every section is optional and falls back to built-in defaults, so an
/// empty document is a valid configuration.
///
/// # Fields
/// * `transform` - Backpressure thresholds and turn size for buffering transforms
/// * `logging` - Diagnostic output settings
///
/// # Example
/// ```yaml
/// transform:
///   threshold_min: 20
///   threshold_max: 100
///   max_per_turn: 64
/// logging:
///   filter: "streamwork=debug"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub transform: TransformOptions,
    pub logging: LoggingConfig,
}

/// Diagnostic output settings.
///
/// `filter` uses `tracing_subscriber::EnvFilter` directive syntax. `RUST_LOG`
/// takes precedence when set.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// On-disk formats a config can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat { extension }),
        }
    }
}

/// Parse a config document of the given format
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<RuntimeConfig, ConfigError> {
    let cfg = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(cfg)
}

/// Load a config from a YAML or TOML file, chosen by extension
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RuntimeConfig, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, format)
}

/// Load and validate a config file
///
/// Rejects transform options that would make a buffering transform unable to
/// make progress (an empty hysteresis band or zero-sized turns).
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<RuntimeConfig, ConfigError> {
    let cfg = load_config(path)?;
    cfg.transform.validate()?;
    Ok(cfg)
}
