//! Batching defaults and field limits for tracked events.
//!
//! Field limits mirror the column sizes of the ingestion backend. A value
//! longer than its column makes the backend reject the whole batch, so the
//! tracker truncates attribution values at capture time.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so some limits are duplicated there. Keep both in sync when modifying.

// === Batching ===

/// Events queued before an immediate flush.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Interval of the recurring flush timer (5 seconds).
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;

/// Upper bound on events in a single delivered batch.
///
/// A flush never exceeds the configured batch size, this only guards
/// against misconfiguration.
pub const MAX_BATCH_EVENTS: usize = 500;

// === String Field Limits (chars) ===

/// Referrer column length.
pub const MAX_REF_LEN: usize = 100;

/// utm_source / utm_medium / utm_campaign column length.
pub const MAX_UTM_LEN: usize = 100;

/// Session id column length.
pub const MAX_SESSION_ID_LEN: usize = 64;

// === Maintenance probe ===

/// Health probe timeout (3 seconds). Kept short so the probe never stalls
/// page requests.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;
