//! BoltPromo interaction tracker.
//!
//! Hosts one event batcher:
//! - Reads page messages (track, navigate, visibility, unload) from stdin
//! - Batches events and flushes them to the site API on size, timer and
//!   lifecycle triggers
//! - Performs a final flush on EOF or Ctrl+C

mod host;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use telemetry::{health, init_tracing_from_env, metrics};
use tracker_client::{
    EventBatcher, ExecutionContext, HttpTransport, MaintenanceProbe, SiteStatus, TrackerConfig,
};
use tracker_core::{FileStore, PageContext};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    /// Probe the API health endpoint before accepting input
    #[serde(default = "default_probe_on_start")]
    probe_on_start: bool,

    #[serde(default)]
    tracker: TrackerConfig,
}

fn default_probe_on_start() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_on_start: default_probe_on_start(),
            tracker: TrackerConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting BoltPromo tracker v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config
        .tracker
        .validate()
        .context("Invalid tracker configuration")?;

    info!(
        api_url = %config.tracker.api_url,
        batch_size = config.tracker.batch_size,
        flush_interval_ms = config.tracker.flush_interval_ms,
        use_beacon = config.tracker.use_beacon,
        "Loaded tracker config"
    );

    if config.probe_on_start {
        check_health(&config.tracker).await?;
    }

    let transport = Arc::new(
        HttpTransport::new(&config.tracker).context("Failed to create HTTP transport")?,
    );
    let store = Arc::new(FileStore::new(&config.tracker.storage_path));

    let batcher = Arc::new(EventBatcher::new(
        config.tracker.clone(),
        transport,
        ExecutionContext::client(store, PageContext::default()),
    ));
    info!(session_id = %batcher.session_id(), "Session resolved");

    let _flush_handle = batcher.start_flush_task();

    let (signals, signal_rx) = mpsc::channel(16);
    let listener = batcher.spawn_lifecycle_listener(signal_rx);

    let lines = host::spawn_line_reader(std::io::BufReader::new(std::io::stdin()))?;

    tokio::select! {
        result = host::run(lines, batcher.clone(), signals) => {
            match result {
                Ok(stats) => info!(tracked = stats.tracked, skipped = stats.skipped, "Input closed"),
                Err(e) => error!("Host input failed: {:#}", e),
            }
        }
        _ = shutdown_signal() => {}
    }

    // The sender is gone once the host loop ends, which stops the listener.
    if let Err(e) = listener.await {
        warn!("Lifecycle listener panicked: {}", e);
    }

    info!("Shutting down...");

    // Delivery failures are already logged with their code.
    if let Ok(count) = batcher.flush_now().await {
        info!(count, "Flushed remaining events");
    }

    let snapshot = metrics().snapshot();
    info!(
        tracked = snapshot.events_tracked,
        flushed = snapshot.events_flushed,
        dropped = snapshot.events_dropped,
        failures = snapshot.delivery_failures,
        "Shutdown complete"
    );
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("TRACKER")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the settings deployments change most
    if let Ok(api_url) = std::env::var("TRACKER_API_URL") {
        config.tracker.api_url = api_url;
    }
    if let Ok(batch_size) = std::env::var("TRACKER_BATCH_SIZE") {
        config.tracker.batch_size = batch_size
            .parse()
            .context("TRACKER_BATCH_SIZE must be an integer")?;
    }
    if let Ok(interval) = std::env::var("TRACKER_FLUSH_INTERVAL_MS") {
        config.tracker.flush_interval_ms = interval
            .parse()
            .context("TRACKER_FLUSH_INTERVAL_MS must be an integer")?;
    }
    if let Ok(use_beacon) = std::env::var("TRACKER_USE_BEACON") {
        config.tracker.use_beacon = use_beacon == "1" || use_beacon.eq_ignore_ascii_case("true");
    }
    if let Ok(path) = std::env::var("TRACKER_STORAGE_PATH") {
        config.tracker.storage_path = PathBuf::from(path);
    }

    Ok(config)
}

/// Check API availability on startup.
async fn check_health(config: &TrackerConfig) -> Result<()> {
    let probe = MaintenanceProbe::new(config).context("Failed to create maintenance probe")?;

    let status = probe.check().await;
    // A failed probe leaves the component unknown rather than healthy.
    let report = health().report();

    match status {
        SiteStatus::Available => info!(
            component = %report.component,
            status = ?report.status,
            "Site API: available"
        ),
        SiteStatus::Maintenance => warn!(
            component = %report.component,
            message = report.message.as_deref().unwrap_or(""),
            "Site API: maintenance, events will likely be dropped"
        ),
    }
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
