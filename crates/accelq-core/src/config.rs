//! Configuration types for accelq

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::device::SelectionPolicy;
use crate::error::{AccelqError, AccelqResult};

/// Top-level configuration for the demo driver and embedding applications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelqConfig {
    /// Dispatch defaults
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AccelqConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            probe: ProbeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AccelqConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> AccelqResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AccelqError::Config(format!("failed to read config file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| AccelqError::Config(format!("failed to parse config: {}", e)))
    }
}

/// Dispatch defaults applied to probed devices and submissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Device selection policy
    pub policy: SelectionPolicy,
    /// Admission slots per device when the probe does not say otherwise
    pub default_max_concurrency: u32,
    /// Budget ceiling per device in bytes; absent means unlimited
    pub default_budget_limit: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::RoundRobin,
            default_max_concurrency: 1,
            default_budget_limit: None,
        }
    }
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Whether to run hardware discovery at startup
    pub enabled: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or text)
    pub format: String,
    /// Log file path (if any)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}
