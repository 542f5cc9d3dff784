//! Event batching and best-effort delivery for the BoltPromo tracker.

pub mod batcher;
pub mod config;
pub mod context;
pub mod maintenance;
pub mod queue;
pub mod transport;

pub use batcher::EventBatcher;
pub use config::TrackerConfig;
pub use context::*;
pub use maintenance::{MaintenanceProbe, RouteDecision, SiteStatus};
pub use transport::{HttpTransport, Transport};
