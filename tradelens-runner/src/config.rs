//! Analysis configuration — metric and report settings, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [metrics]
//! confidence_levels = [0.95, 0.99]
//! top_trades = 10
//!
//! [report]
//! precision = 4
//! timestamp_format = "%Y-%m-%dT%H:%M:%S"
//! ```

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest rounding precision accepted for report output.
pub const MAX_PRECISION: u32 = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings for the metrics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Confidence levels for the VaR/CVaR table, each in (0, 1).
    pub confidence_levels: Vec<f64>,
    /// Number of best and worst trades to keep.
    pub top_trades: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            confidence_levels: vec![0.95, 0.99],
            top_trades: 10,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for c in &self.confidence_levels {
            if !(*c > 0.0 && *c < 1.0) {
                return Err(ConfigError::Invalid {
                    field: "metrics.confidence_levels",
                    reason: format!("{c} is outside (0, 1)"),
                });
            }
        }
        Ok(())
    }
}

/// Settings for report shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Decimal places for every float in the report.
    pub precision: u32,
    /// `strftime` pattern for trade timestamps.
    pub timestamp_format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            precision: 4,
            timestamp_format: "%Y-%m-%dT%H:%M:%S".to_string(),
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precision > MAX_PRECISION {
            return Err(ConfigError::Invalid {
                field: "report.precision",
                reason: format!("{} exceeds {MAX_PRECISION}", self.precision),
            });
        }
        // chrono panics when displaying a malformed pattern; reject it up front.
        if self.timestamp_format.is_empty()
            || StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error))
        {
            return Err(ConfigError::Invalid {
                field: "report.timestamp_format",
                reason: format!("'{}' is not a valid strftime pattern", self.timestamp_format),
            });
        }
        Ok(())
    }
}

/// Full analysis configuration as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub metrics: MetricsConfig,
    pub report: ReportConfig,
}

impl AnalysisConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.metrics.validate()?;
        self.report.validate()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
