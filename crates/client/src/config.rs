//! Client configuration
//!
//! Supports YAML configuration files with module-based organization

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest number of pairs a single scan returns
pub const MAX_RAW_KV_SCAN_LIMIT: u32 = 10240;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Metadata service configuration
    #[serde(default)]
    pub pd: PdConfig,
    /// Store connection configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Scan configuration
    #[serde(default)]
    pub scan: ScanConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Configuration pointing at a single metadata service address
    pub fn with_pd_endpoint(endpoint: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.pd.endpoints = vec![endpoint.into()];
        config
    }

    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Merge with another config (other takes precedence)
    ///
    /// Empty lists and strings, zero numbers and `None` in `other` leave the
    /// current value in place.
    pub fn merge(&mut self, other: Config) {
        self.pd.merge(other.pd);
        self.store.merge(other.store);
        self.scan.merge(other.scan);
        self.log.merge(other.log);
    }
}

/// Metadata service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdConfig {
    /// Bootstrap addresses, tried in order
    #[serde(default = "default_pd_endpoints")]
    pub endpoints: Vec<String>,
    /// Request timeout in seconds
    #[serde(default = "default_pd_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PdConfig {
    fn default() -> Self {
        Self {
            endpoints: default_pd_endpoints(),
            request_timeout_secs: default_pd_request_timeout_secs(),
        }
    }
}

impl PdConfig {
    fn merge(&mut self, other: Self) {
        if !other.endpoints.is_empty() {
            self.endpoints = other.endpoints;
        }
        if other.request_timeout_secs > 0 {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connect timeout in milliseconds
    #[serde(default = "default_store_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Per-call deadline in seconds, none by default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_store_connect_timeout_ms(),
            request_timeout_secs: None,
        }
    }
}

impl StoreConfig {
    fn merge(&mut self, other: Self) {
        if other.connect_timeout_ms > 0 {
            self.connect_timeout_ms = other.connect_timeout_ms;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get per-call deadline as Duration
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum pairs returned by one scan
    #[serde(default = "default_scan_limit")]
    pub limit: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            limit: default_scan_limit(),
        }
    }
}

impl ScanConfig {
    fn merge(&mut self, other: Self) {
        if other.limit > 0 {
            self.limit = other.limit;
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    fn merge(&mut self, other: Self) {
        if !other.level.is_empty() {
            self.level = other.level;
        }
    }
}

// Default value functions

fn default_pd_endpoints() -> Vec<String> {
    vec!["127.0.0.1:2379".to_string()]
}

fn default_pd_request_timeout_secs() -> u64 {
    5
}

fn default_store_connect_timeout_ms() -> u64 {
    3000 // 3 seconds
}

fn default_scan_limit() -> u32 {
    MAX_RAW_KV_SCAN_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
