//! Delivery transports for encoded batches.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;
use tracker_core::{Error, Result};
use url::Url;

use crate::batcher::record_failure;
use crate::config::TrackerConfig;

/// Delivers encoded `{"events": [...]}` bodies to the ingestion endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hands the payload to a channel that outlives the caller and returns
    /// immediately. Returns `false` when the channel is unavailable or
    /// refused the payload; nothing was sent in that case.
    ///
    /// Once accepted, the outcome is only known to the channel, so it owns
    /// the flushed/dropped accounting for the `events` in the payload.
    fn send_beacon(&self, payload: Bytes, events: usize) -> bool;

    /// Sends the payload as a standard request. Completes once the request
    /// is sent; the response body is never read.
    async fn post(&self, payload: Bytes) -> Result<()>;
}

/// HTTP transport backed by reqwest.
///
/// The beacon channel is a detached task on the current tokio runtime, so
/// it keeps running after the batcher that started it is gone.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    beacon: bool,
}

impl HttpTransport {
    /// Creates a transport for the configured ingestion endpoint.
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.track_url()?,
            beacon: config.use_beacon,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn send_beacon(&self, payload: Bytes, events: usize) -> bool {
        if !self.beacon {
            return false;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };

        let transport = self.clone();
        handle.spawn(async move {
            match transport.post(payload).await {
                Ok(()) => metrics().events_flushed.inc_by(events as u64),
                Err(e) => record_failure(&e, events),
            }
        });
        true
    }

    async fn post(&self, payload: Bytes) -> Result<()> {
        let start = Instant::now();
        let size = payload.len();

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::network(format!("POST {} failed: {}", self.url, e)))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        metrics().post_latency_ms.observe(latency_ms);

        debug!(
            url = %self.url,
            status = %response.status(),
            bytes = size,
            latency_ms = latency_ms,
            "Delivered batch"
        );

        Ok(())
    }
}
