//! Plugin configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level plugin configuration, usually deserialized from the
/// embedder's plugin-settings blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub warm_up: WarmUpSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmUpSettings {
    /// Milliseconds to wait for the backend's ready signal before the
    /// warm-up fails. `0` waits without bound.
    pub ready_timeout_ms: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            warm_up: WarmUpSettings::default(),
        }
    }
}

impl Default for WarmUpSettings {
    fn default() -> Self {
        Self {
            ready_timeout_ms: 30_000,
        }
    }
}

impl PluginConfig {
    /// Read configuration out of an embedder-supplied JSON value.
    pub fn from_value(value: serde_json::Value) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

impl WarmUpSettings {
    /// The configured timeout, `None` when unbounded.
    pub fn ready_timeout(&self) -> Option<Duration> {
        (self.ready_timeout_ms > 0).then(|| Duration::from_millis(self.ready_timeout_ms))
    }
}
