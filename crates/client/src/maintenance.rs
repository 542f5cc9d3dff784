//! Maintenance-mode probe.
//!
//! Before serving a page the site asks the API health endpoint whether it is
//! in maintenance. Only an explicit 503 counts; any probe failure fails open.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use telemetry::health;
use tracing::{debug, warn};
use tracker_core::{Error, Result};
use url::Url;

use crate::config::TrackerConfig;

/// Path of the maintenance page.
pub const MAINTENANCE_PATH: &str = "/maintenance";

/// Path prefixes that are never probed.
const BYPASS_PREFIXES: [&str; 3] = [MAINTENANCE_PATH, "/_next", "/static"];

/// API availability as reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Available,
    Maintenance,
}

/// What to do with an incoming page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Pass,
    Redirect(String),
}

/// Whether a request path is subject to the maintenance check.
///
/// The maintenance page itself, framework assets, static files and anything
/// that looks like a file (has a dot) are skipped.
pub fn should_probe(path: &str) -> bool {
    !BYPASS_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) && !path.contains('.')
}

/// Probes the API health endpoint.
#[derive(Clone)]
pub struct MaintenanceProbe {
    client: reqwest::Client,
    health_url: Url,
}

impl MaintenanceProbe {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            health_url: config.health_url()?,
        })
    }

    /// Checks the health endpoint and records the result.
    pub async fn check(&self) -> SiteStatus {
        let response = self
            .client
            .get(self.health_url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await;

        match response {
            Ok(resp) if resp.status() == StatusCode::SERVICE_UNAVAILABLE => {
                health().ingest_api.set_unhealthy("health endpoint returned 503");
                debug!(url = %self.health_url, "API in maintenance");
                SiteStatus::Maintenance
            }
            Ok(resp) => {
                health().ingest_api.set_healthy();
                debug!(url = %self.health_url, status = %resp.status(), "API available");
                SiteStatus::Available
            }
            Err(e) => {
                warn!(url = %self.health_url, error = %e, "Health check failed");
                SiteStatus::Available
            }
        }
    }

    /// Decides whether a page request should go to the maintenance page.
    pub async fn route(&self, path: &str) -> RouteDecision {
        if !should_probe(path) {
            return RouteDecision::Pass;
        }

        match self.check().await {
            SiteStatus::Maintenance => RouteDecision::Redirect(MAINTENANCE_PATH.to_string()),
            SiteStatus::Available => RouteDecision::Pass,
        }
    }
}
