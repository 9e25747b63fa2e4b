//! Telemetry metric name constants.
//!
//! Centralised metric names for eventide operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `eventide_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `resource` - query resource name (e.g. "events/search", "events/get")
//! - `status` - outcome: "ok" or an error code such as "RATE_LIMITED"

/// Total network requests issued by query coordinators.
///
/// Labels: `resource`, `status`.
pub const REQUESTS_TOTAL: &str = "eventide_requests_total";

/// Total cache hits.
///
/// Labels: `resource`.
pub const CACHE_HITS_TOTAL: &str = "eventide_cache_hits_total";

/// Total cache misses, including expired entries.
///
/// Labels: `resource`.
pub const CACHE_MISSES_TOTAL: &str = "eventide_cache_misses_total";

/// Responses dropped because their cancellation token was no longer current.
///
/// Labels: `resource`.
pub const STALE_RESPONSES_TOTAL: &str = "eventide_stale_responses_total";

/// Optimistic sends settled by the mutation coordinator.
///
/// Labels: `status` ("confirmed" | "failed").
pub const OPTIMISTIC_SENDS_TOTAL: &str = "eventide_optimistic_sends_total";
