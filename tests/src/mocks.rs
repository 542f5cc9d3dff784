//! Mock implementations for testing.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tracker_client::Transport;
use tracker_core::{Error, Result, TrackBatch};

/// Which channel a batch arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Beacon,
    Post,
}

/// Mock transport that captures batches in memory.
///
/// This implements the same `Transport` trait as `HttpTransport`, so tests
/// see exactly the request bodies the batcher would send.
#[derive(Clone)]
pub struct MockTransport {
    batches: Arc<Mutex<Vec<(Channel, TrackBatch)>>>,
    /// Whether the beacon channel is available.
    beacon: Arc<Mutex<bool>>,
    /// Simulate network failures on the post channel.
    should_fail: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
            beacon: Arc::new(Mutex::new(true)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// A transport without a beacon channel, forcing the post fallback.
    pub fn without_beacon() -> Self {
        let mock = Self::new();
        mock.set_beacon(false);
        mock
    }

    /// Get all captured batches.
    pub fn captured_batches(&self) -> Vec<TrackBatch> {
        self.batches.lock().iter().map(|(_, b)| b.clone()).collect()
    }

    /// Channels used, in delivery order.
    pub fn channels(&self) -> Vec<Channel> {
        self.batches.lock().iter().map(|(c, _)| *c).collect()
    }

    /// Get the count of captured batches.
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// Get the count of captured events across batches.
    pub fn event_count(&self) -> usize {
        self.batches.lock().iter().map(|(_, b)| b.len()).sum()
    }

    pub fn set_beacon(&self, available: bool) {
        *self.beacon.lock() = available;
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn capture(&self, channel: Channel, payload: &Bytes) {
        let batch = TrackBatch::decode(payload).expect("batcher sent an undecodable body");
        self.batches.lock().push((channel, batch));
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn send_beacon(&self, payload: Bytes, _events: usize) -> bool {
        if !*self.beacon.lock() {
            return false;
        }
        self.capture(Channel::Beacon, &payload);
        true
    }

    async fn post(&self, payload: Bytes) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::network("Mock transport failure"));
        }
        self.capture(Channel::Post, &payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::{Attribution, TrackEvent};

    fn payload() -> Bytes {
        let event = TrackEvent::promo_view(1).stamp("1_abc", &Attribution::default());
        Bytes::from(TrackBatch::new(vec![event]).encode().unwrap())
    }

    #[tokio::test]
    async fn test_mock_transport_captures_batches() {
        let mock = MockTransport::new();

        assert!(mock.send_beacon(payload(), 1));
        mock.post(payload()).await.unwrap();

        assert_eq!(mock.batch_count(), 2);
        assert_eq!(mock.channels(), vec![Channel::Beacon, Channel::Post]);
        assert_eq!(mock.captured_batches()[0].events[0].promo_id, Some(1));
    }

    #[tokio::test]
    async fn test_mock_transport_failure_mode() {
        let mock = MockTransport::without_beacon();
        mock.set_should_fail(true);

        assert!(!mock.send_beacon(payload(), 1));
        assert!(mock.post(payload()).await.is_err());
        assert_eq!(mock.batch_count(), 0);
    }
}
