//! Engine configuration.
//!
//! Every field has a default matching what Tournament Manager automation
//! needs out of the box, so an empty JSON object is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::CachePolicy;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse JSON content.
    #[error("failed to parse config JSON: {source}")]
    Json {
        /// The underlying JSON parse error.
        #[from]
        source: serde_json::Error,
    },
}

/// Settings for a [`crate::BridgeEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reuse slow-changing fields between full refreshes.
    pub low_cpu_usage: bool,
    /// Iterations per full refresh when `low_cpu_usage` is on.
    pub cache_cycle: u32,
    /// Target period of one monitor iteration.
    pub poll_interval_ms: u64,
    /// Wait after a failed reconnect before trying again.
    pub reconnect_backoff_ms: u64,
    /// Buffer size of snapshot streams opened on engine fieldsets.
    pub stream_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_cpu_usage: true,
            cache_cycle: 10,
            poll_interval_ms: 10,
            reconnect_backoff_ms: 1000,
            stream_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the string is not valid JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Json`] if the content is not valid JSON.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Poll caching derived from `low_cpu_usage` and `cache_cycle`.
    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            enabled: self.low_cpu_usage,
            cycle: self.cache_cycle.max(1),
        }
    }

    /// Target period of one monitor iteration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Wait after a failed reconnect.
    #[must_use]
    pub const fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    /// Stream buffer size, at least 1.
    #[must_use]
    pub fn stream_capacity(&self) -> usize {
        self.stream_capacity.max(1)
    }
}
