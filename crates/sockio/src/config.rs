//! JSON configuration for the I/O layer.
//!
//! Every field has a default, so an empty object (or a missing field) is a
//! valid config. Timeouts are whole seconds; zero or negative means wait
//! forever.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::IoContext;
use crate::timeout::Timeout;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// I/O settings as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IoConfig {
    pub retry_on_interrupt: bool,
    pub quick_ack: bool,
    pub network_timeout_secs: i64,
    pub connect_timeout_secs: i64,
    /// Flush received files to disk every this many bytes; 0 disables.
    pub fsync_after_written_bytes: u64,
    /// Overrides the idle time derived from the network timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keepalive_idle_secs: Option<i32>,
}

impl Default for IoConfig {
    fn default() -> Self {
        let ctx = IoContext::default();
        Self {
            retry_on_interrupt: ctx.retry_on_interrupt,
            quick_ack: ctx.quick_ack,
            network_timeout_secs: 60,
            connect_timeout_secs: 10,
            fsync_after_written_bytes: 0,
            keepalive_idle_secs: None,
        }
    }
}

impl IoConfig {
    /// Loads a config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no io config, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), "io config loaded");
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The runtime switches this config describes.
    pub fn context(&self) -> IoContext {
        IoContext {
            retry_on_interrupt: self.retry_on_interrupt,
            quick_ack: self.quick_ack,
        }
    }

    pub fn network_timeout(&self) -> Timeout {
        Timeout::from_secs(self.network_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Timeout {
        Timeout::from_secs(self.connect_timeout_secs)
    }

    pub fn keepalive_idle(&self) -> i32 {
        self.keepalive_idle_secs
            .unwrap_or_else(|| crate::sockopt::keepalive_idle_for(self.network_timeout()))
    }
}
