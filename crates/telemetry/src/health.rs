//! Health state of the remote ingestion API.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Health status for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Maintenance,
    Unknown,
}

/// Component health state.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    probed: AtomicBool,
    healthy: AtomicBool,
    message: parking_lot::RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            probed: AtomicBool::new(false),
            healthy: AtomicBool::new(false),
            message: parking_lot::RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.probed.store(true, Ordering::Relaxed);
        self.healthy.store(true, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.probed.store(true, Ordering::Relaxed);
        self.healthy.store(false, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> HealthStatus {
        if !self.probed.load(Ordering::Relaxed) {
            HealthStatus::Unknown
        } else if self.is_healthy() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Maintenance
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }
}

/// Point-in-time health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub component: String,
    pub status: HealthStatus,
    pub message: Option<String>,
}

/// Global health registry.
pub struct HealthRegistry {
    pub ingest_api: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            ingest_api: ComponentHealth::new("ingest_api"),
        }
    }

    /// Generate a health report.
    pub fn report(&self) -> HealthReport {
        HealthReport {
            component: self.ingest_api.name().to_string(),
            status: self.ingest_api.status(),
            message: self.ingest_api.message(),
        }
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
