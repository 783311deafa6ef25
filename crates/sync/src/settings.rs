// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync settings.
//!
//! Stored in `config.toml` inside the state directory:
//!
//! ```toml
//! database = "queue.db"
//!
//! [remote]
//! base_url = "https://api.example.com/v1"
//!
//! [sync]
//! interval_secs = 30
//! max_retry = 5
//!
//! [retention]
//! interval_secs = 86400
//! horizon_days = 30
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tb_core::{DEFAULT_MAX_RETRY, RETENTION_HORIZON_DAYS};

use crate::error::{SyncError, SyncResult};
use crate::scheduler::Intervals;

/// Settings file name within the state directory.
pub const SETTINGS_FILE_NAME: &str = "config.toml";

/// Longest accepted retention horizon, in days.
pub const MAX_HORIZON_DAYS: i64 = 36_500;

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Queue database path (relative to the state directory or absolute).
    #[serde(default = "default_database")]
    pub database: String,
    /// Remote API location.
    pub remote: RemoteSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub retention: RetentionSettings,
    #[serde(default)]
    pub connectivity: ConnectivitySettings,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL, `http://` or `https://`.
    pub base_url: String,
    /// Optional bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// Sync engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Seconds between periodic drains (default: 30).
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    /// Failed attempts before a record is dead-lettered (default: 5).
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
}

/// Retention job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSettings {
    /// Seconds between sweeps (default: 86400).
    #[serde(default = "default_retention_interval_secs")]
    pub interval_secs: u64,
    /// Age in days after which synced records are deleted (default: 30).
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
}

/// Reachability probe settings (daemon only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySettings {
    /// Seconds between reachability probes (default: 10).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Max time for one probe in milliseconds (default: 2000).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_database() -> String {
    "queue.db".to_string()
}

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_max_retry() -> u32 {
    DEFAULT_MAX_RETRY
}

fn default_retention_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_horizon_days() -> i64 {
    RETENTION_HORIZON_DAYS
}

fn default_probe_interval_secs() -> u64 {
    10
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval_secs: default_sync_interval_secs(),
            max_retry: default_max_retry(),
        }
    }
}

impl Default for RetentionSettings {
    fn default() -> Self {
        RetentionSettings {
            interval_secs: default_retention_interval_secs(),
            horizon_days: default_horizon_days(),
        }
    }
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        ConnectivitySettings {
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl RetentionSettings {
    /// The retention horizon as a duration, clamped to the accepted range.
    pub fn horizon(&self) -> chrono::Duration {
        chrono::Duration::days(self.horizon_days.clamp(1, MAX_HORIZON_DAYS))
    }
}

impl Settings {
    /// Loads settings from the given state directory.
    pub fn load(state_dir: &Path) -> SyncResult<Self> {
        let path = state_dir.join(SETTINGS_FILE_NAME);
        let content = fs::read_to_string(&path).map_err(|e| {
            SyncError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml(content: &str) -> SyncResult<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| SyncError::Config(format!("failed to parse config: {}", e)))?;
        if let Some(problem) = settings.validate() {
            return Err(SyncError::Config(problem));
        }
        Ok(settings)
    }

    /// Returns a description of the first invalid value, if any.
    pub fn validate(&self) -> Option<String> {
        let url = &self.remote.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Some(format!(
                "invalid remote base_url '{}': must start with http:// or https://",
                url
            ));
        }
        if self.sync.interval_secs == 0 {
            return Some("sync.interval_secs must be greater than 0".to_string());
        }
        if self.sync.max_retry == 0 {
            return Some("sync.max_retry must be greater than 0".to_string());
        }
        if self.retention.interval_secs == 0 {
            return Some("retention.interval_secs must be greater than 0".to_string());
        }
        if !(1..=MAX_HORIZON_DAYS).contains(&self.retention.horizon_days) {
            return Some(format!(
                "retention.horizon_days must be between 1 and {}",
                MAX_HORIZON_DAYS
            ));
        }
        if self.connectivity.probe_interval_secs == 0 {
            return Some("connectivity.probe_interval_secs must be greater than 0".to_string());
        }
        None
    }

    /// Resolves the queue database path against the state directory.
    pub fn database_path(&self, state_dir: &Path) -> PathBuf {
        let path = PathBuf::from(&self.database);
        if path.is_absolute() {
            path
        } else {
            state_dir.join(path)
        }
    }

    /// Timer periods for the background tasks.
    pub fn intervals(&self) -> Intervals {
        Intervals {
            sync: Duration::from_secs(self.sync.interval_secs),
            retention: Duration::from_secs(self.retention.interval_secs),
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
