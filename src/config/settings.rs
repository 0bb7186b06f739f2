//! Settings structures for gatherbox configuration

use crate::error::SearchError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timeout: TimeoutSettings,
    pub concurrent: ConcurrencySettings,
    /// Push-window duration in milliseconds: how long near-simultaneous
    /// provider results are buffered before one batched update is emitted.
    pub force_push_delay_ms: u64,
    /// Capacity of the bounded per-session update channel.
    pub update_channel_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: TimeoutSettings::default(),
            concurrent: ConcurrencySettings::default(),
            force_push_delay_ms: 50,
            update_channel_capacity: 16,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (GATHERBOX_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("GATHERBOX_TIMEOUT_DEFAULT_MS") {
            if let Ok(ms) = val.parse() {
                self.timeout.default_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("GATHERBOX_TIMEOUT_FALLBACK_MS") {
            if let Ok(ms) = val.parse() {
                self.timeout.fallback_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("GATHERBOX_CONCURRENT_DEFAULT") {
            if let Ok(n) = val.parse() {
                self.concurrent.default_providers = n;
            }
        }
        if let Ok(val) = std::env::var("GATHERBOX_CONCURRENT_FALLBACK") {
            if let Ok(n) = val.parse() {
                self.concurrent.fallback_providers = n;
            }
        }
        if let Ok(val) = std::env::var("GATHERBOX_FORCE_PUSH_DELAY_MS") {
            if let Ok(ms) = val.parse() {
                self.force_push_delay_ms = ms;
            }
        }
    }

    /// Validate the settings, rejecting non-positive values.
    ///
    /// Called synchronously at engine construction and at `search()` time,
    /// before any session work starts.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout.default_ms == 0 {
            return Err(SearchError::configuration(
                "timeout.default_ms must be positive",
            ));
        }
        if self.timeout.fallback_ms == 0 {
            return Err(SearchError::configuration(
                "timeout.fallback_ms must be positive",
            ));
        }
        if self.concurrent.default_providers == 0 {
            return Err(SearchError::configuration(
                "concurrent.default_providers must be positive",
            ));
        }
        if self.concurrent.fallback_providers == 0 {
            return Err(SearchError::configuration(
                "concurrent.fallback_providers must be positive",
            ));
        }
        if self.force_push_delay_ms == 0 {
            return Err(SearchError::configuration(
                "force_push_delay_ms must be positive",
            ));
        }
        if self.update_channel_capacity == 0 {
            return Err(SearchError::configuration(
                "update_channel_capacity must be positive",
            ));
        }
        Ok(())
    }

    /// Push-window duration as a [`Duration`]
    pub fn force_push_delay(&self) -> Duration {
        Duration::from_millis(self.force_push_delay_ms)
    }
}

/// Per-tier timeout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Max wait per default-tier provider call, in milliseconds
    pub default_ms: u64,
    /// Max wait per fallback-tier provider call, in milliseconds
    pub fallback_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            default_ms: 50,
            fallback_ms: 3000,
        }
    }
}

impl TimeoutSettings {
    pub fn default_tier(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    pub fn fallback_tier(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }
}

/// Per-tier concurrency caps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencySettings {
    /// Max simultaneous default-tier provider calls
    pub default_providers: usize,
    /// Max simultaneous fallback-tier provider calls
    pub fallback_providers: usize,
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            default_providers: 5,
            fallback_providers: 10,
        }
    }
}
