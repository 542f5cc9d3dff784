//! Internal telemetry for the BoltPromo tracker.
//!
//! Delivery is best-effort, so counters here are the only record of how
//! many events were dropped.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
