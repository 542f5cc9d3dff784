//! Event batcher: queues interactions and flushes them best-effort.

use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracker_core::{
    resolve_session_id, Attribution, Error, PageContext, Result, SessionId, TrackBatch,
    TrackEvent,
};

use crate::config::TrackerConfig;
use crate::context::{ExecutionContext, LifecycleEvent};
use crate::queue::EventQueue;
use crate::transport::Transport;

/// Batches tracked events and flushes them to a [`Transport`].
///
/// Flushing never waits for delivery and never fails: the queue is emptied
/// first, and a batch that cannot be delivered is logged and dropped.
pub struct EventBatcher {
    config: TrackerConfig,
    queue: EventQueue,
    transport: Arc<dyn Transport>,
    session_id: SessionId,
    page: RwLock<PageContext>,
    server_side: bool,
}

impl EventBatcher {
    /// Creates a batcher, resolving the session id for the context.
    pub fn new(
        config: TrackerConfig,
        transport: Arc<dyn Transport>,
        context: ExecutionContext,
    ) -> Self {
        let (session_id, page, server_side) = match context {
            ExecutionContext::Client { store, page } => {
                let session_id = resolve_session_id(store.as_ref()).unwrap_or_else(|e| {
                    metrics().delivery_failures.inc();
                    warn!(error = %e, "Session storage unavailable, using unpersisted session id");
                    SessionId::generate()
                });
                (session_id, page, false)
            }
            ExecutionContext::Server => (SessionId::disposable(), PageContext::default(), true),
        };

        debug!(session_id = %session_id, server_side, "Created event batcher");

        Self {
            queue: EventQueue::new(config.batch_size),
            config,
            transport,
            session_id,
            page: RwLock::new(page),
            server_side,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_server_side(&self) -> bool {
        self.server_side
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Replaces the current page. Later events take their attribution from it.
    pub fn navigate(&self, page: PageContext) {
        *self.page.write() = page;
    }

    pub fn page(&self) -> PageContext {
        self.page.read().clone()
    }

    /// Queues an event stamped with the session id and current attribution.
    ///
    /// Flushes immediately once the queue reaches the batch size.
    pub fn track(&self, event: TrackEvent) {
        let attribution = Attribution::capture(&self.page.read());
        let event = event.stamp(self.session_id.as_str(), &attribution);

        metrics().events_tracked.inc();

        if let Some(batch) = self.queue.push(event) {
            debug!(count = batch.len(), "Batch size reached, flushing");
            self.dispatch(batch);
        }

        metrics().queue_depth.set(self.queue.len() as u64);
    }

    /// Takes the queue and hands it to the transport without waiting.
    ///
    /// Returns the number of events taken.
    pub fn flush(&self) -> usize {
        let batch = self.queue.take();
        metrics().queue_depth.set(0);

        let count = batch.len();
        if count > 0 {
            self.dispatch(batch);
        }
        count
    }

    /// Takes the queue and awaits a standard request for it.
    ///
    /// Used on shutdown, when no detached channel would outlive the process.
    /// Returns the number of events taken, like [`EventBatcher::flush`]. The
    /// queue is empty afterwards whether or not delivery succeeded.
    pub async fn flush_now(&self) -> Result<usize> {
        let batch = self.queue.take();
        metrics().queue_depth.set(0);

        let count = batch.len();
        if count == 0 {
            return Ok(0);
        }
        metrics().flushes.inc();

        if self.server_side {
            debug!(count, "Discarding batch tracked during server render");
            metrics().events_dropped.inc_by(count as u64);
            return Ok(count);
        }

        let payload = encode(batch).inspect_err(|e| record_failure(e, count))?;
        deliver(self.transport.as_ref(), payload, count).await?;
        Ok(count)
    }

    /// Reacts to a page lifecycle signal. Returns the number of events flushed.
    pub fn handle_lifecycle(&self, event: LifecycleEvent) -> usize {
        if !event.triggers_flush() {
            return 0;
        }
        let flushed = self.flush();
        if flushed > 0 {
            debug!(?event, count = flushed, "Flushed on lifecycle signal");
        }
        flushed
    }

    /// Starts the recurring flush timer.
    ///
    /// Returns `None` in a server context, where nothing is delivered. The
    /// task stops once the batcher is dropped.
    pub fn start_flush_task(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.server_side {
            return None;
        }

        let period = self.config.flush_interval();
        let batcher = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);

            loop {
                ticker.tick().await;

                let Some(batcher) = batcher.upgrade() else {
                    break;
                };
                batcher.flush();
            }
        }))
    }

    /// Feeds lifecycle signals from the host into the batcher until the
    /// sender is dropped.
    pub fn spawn_lifecycle_listener(
        self: &Arc<Self>,
        mut signals: mpsc::Receiver<LifecycleEvent>,
    ) -> JoinHandle<()> {
        let batcher = self.clone();

        tokio::spawn(async move {
            while let Some(event) = signals.recv().await {
                batcher.handle_lifecycle(event);
            }
        })
    }

    /// Delivers a taken batch, preferring the beacon channel.
    fn dispatch(&self, batch: Vec<TrackEvent>) {
        let count = batch.len();
        metrics().flushes.inc();

        if self.server_side {
            debug!(count, "Discarding batch tracked during server render");
            metrics().events_dropped.inc_by(count as u64);
            return;
        }

        let payload = match encode(batch) {
            Ok(payload) => payload,
            Err(e) => {
                record_failure(&e, count);
                return;
            }
        };

        if self.config.use_beacon && self.transport.send_beacon(payload.clone(), count) {
            metrics().beacon_sends.inc();
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            record_failure(&Error::network("no async runtime to send request on"), count);
            return;
        };

        let transport = self.transport.clone();
        handle.spawn(async move {
            let _ = deliver(transport.as_ref(), payload, count).await;
        });
    }
}

impl Drop for EventBatcher {
    fn drop(&mut self) {
        let pending = self.queue.len();
        if pending > 0 {
            info!(pending, "Event batcher dropped with unflushed events");
            metrics().events_dropped.inc_by(pending as u64);
        }
    }
}

fn encode(batch: Vec<TrackEvent>) -> Result<Bytes> {
    TrackBatch::new(batch).encode().map(Bytes::from)
}

async fn deliver(transport: &dyn Transport, payload: Bytes, count: usize) -> Result<()> {
    metrics().post_sends.inc();

    match transport.post(payload).await {
        Ok(()) => {
            metrics().events_flushed.inc_by(count as u64);
            Ok(())
        }
        Err(e) => {
            record_failure(&e, count);
            Err(e)
        }
    }
}

pub(crate) fn record_failure(error: &Error, count: usize) {
    metrics().delivery_failures.inc();
    metrics().events_dropped.inc_by(count as u64);
    warn!(
        code = error.error_code().unwrap_or("-"),
        error = %error,
        dropped = count,
        "Analytics delivery failed"
    );
}
