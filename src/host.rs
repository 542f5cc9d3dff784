//! Host protocol: one JSON message per stdin line.
//!
//! ```text
//! {"kind":"navigate","url":"https://boltpromo.ru/?utm_source=vk","referrer":"https://vk.com/"}
//! {"kind":"track","event_type":"promo_copy","promo_id":42}
//! {"kind":"visibility","state":"hidden"}
//! {"kind":"unload"}
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracker_client::{EventBatcher, LifecycleEvent, Visibility};
use tracker_core::{PageContext, TrackEvent};

/// A message from the host page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HostMessage {
    Track(TrackEvent),
    Navigate {
        url: String,
        #[serde(default)]
        referrer: Option<String>,
    },
    Visibility {
        state: Visibility,
    },
    Unload,
}

impl HostMessage {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Invalid host message")
    }
}

/// Counts of what a host session did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostStats {
    pub tracked: usize,
    pub skipped: usize,
}

/// Applies one message. Lifecycle signals go through `signals` so they are
/// handled by the batcher's listener.
async fn apply(
    message: HostMessage,
    batcher: &EventBatcher,
    signals: &mpsc::Sender<LifecycleEvent>,
) -> Result<()> {
    match message {
        HostMessage::Track(event) => batcher.track(event),
        HostMessage::Navigate { url, referrer } => {
            let mut page = PageContext::parse(&url)?;
            page.referrer = referrer;
            batcher.navigate(page);
        }
        HostMessage::Visibility { state } => {
            signals
                .send(LifecycleEvent::VisibilityChanged(state))
                .await
                .context("Lifecycle listener stopped")?;
        }
        HostMessage::Unload => {
            signals
                .send(LifecycleEvent::BeforeUnload)
                .await
                .context("Lifecycle listener stopped")?;
        }
    }
    Ok(())
}

/// Lines buffered between the reader thread and the host loop.
const LINE_BUFFER: usize = 64;

/// Reads lines on a dedicated thread and forwards them to the host loop.
///
/// Blocking reads stay off the runtime, so a shutdown never waits for input
/// that may not arrive. The thread ends at EOF or once the receiver is gone.
pub fn spawn_line_reader<R>(reader: R) -> Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);

    thread::Builder::new()
        .name("host-input".into())
        .spawn(move || {
            for line in reader.lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn input reader thread")?;

    Ok(rx)
}

/// Applies messages until the input ends. Bad lines are logged and skipped.
pub async fn run(
    mut lines: mpsc::Receiver<io::Result<String>>,
    batcher: Arc<EventBatcher>,
    signals: mpsc::Sender<LifecycleEvent>,
) -> Result<HostStats> {
    let mut stats = HostStats::default();

    while let Some(line) = lines.recv().await {
        let line = line.context("Failed to read host input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message = match HostMessage::parse(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Skipping host message");
                stats.skipped += 1;
                continue;
            }
        };

        let is_track = matches!(message, HostMessage::Track(_));
        if let Err(e) = apply(message, &batcher, &signals).await {
            warn!(error = %e, "Failed to apply host message");
            stats.skipped += 1;
            continue;
        }
        if is_track {
            stats.tracked += 1;
        }
    }

    debug!(tracked = stats.tracked, skipped = stats.skipped, "Host input closed");
    Ok(stats)
}
