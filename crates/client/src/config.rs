//! Tracker configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracker_core::limits::{
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS, MAX_BATCH_EVENTS,
};
use tracker_core::{Error, Result};
use url::Url;

/// Batching and delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL of the site API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Ingestion endpoint path
    #[serde(default = "default_track_path")]
    pub track_path: String,
    /// Health endpoint path used by the maintenance probe
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Queue length that triggers an immediate flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Recurring flush interval in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Prefer the non-blocking beacon channel
    #[serde(default = "default_use_beacon")]
    pub use_beacon: bool,
    /// Client storage file holding the session id
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    /// Maintenance probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_api_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_track_path() -> String {
    "/api/v1/track/".to_string()
}

fn default_health_path() -> String {
    "/api/v1/health/".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_use_beacon() -> bool {
    true
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".boltpromo/storage.json")
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            track_path: default_track_path(),
            health_path: default_health_path(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            use_beacon: default_use_beacon(),
            storage_path: default_storage_path(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl TrackerConfig {
    /// Config pointing at a different API base, all else default.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Full URL of the ingestion endpoint.
    pub fn track_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.api_url)?.join(&self.track_path)?)
    }

    /// Full URL of the health endpoint.
    pub fn health_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.api_url)?.join(&self.health_path)?)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Rejects settings the batcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_EVENTS {
            return Err(Error::config(format!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_EVENTS, self.batch_size
            )));
        }
        if self.flush_interval_ms == 0 {
            return Err(Error::config("flush_interval_ms must be positive"));
        }
        self.track_url()?;
        self.health_url()?;
        Ok(())
    }
}
