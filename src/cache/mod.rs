//! Keyed result cache with TTL expiry.
//!
//! [`CacheStore`] holds query results keyed on a [`RequestSignature`]. It is
//! shared between query coordinators through an `Arc`, so two coordinators
//! asking for the same signature observe the same entry.
//!
//! # Expiry
//!
//! Entries record the time they were stored, read from an injected
//! [`Clock`]. An entry is expired once `now - stored_at > ttl`. Expired
//! entries are treated as absent and evicted by the read that notices them;
//! nothing sweeps the store in the background. Capacity is bounded by moka's
//! size-bounded eviction (default 1,000 entries).

pub mod signature;

pub use signature::{RequestSignature, SignatureBuilder};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Source of the current time for TTL decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by [`tokio::time::Instant`].
///
/// Follows tokio's paused time in tests (`start_paused = true`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic expiry tests.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

/// Configuration for a [`CacheStore`].
///
/// ```rust
/// # use eventide::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 5 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// A stored result. Consumers receive clones; the store owns the original.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: RequestSignature,
    pub payload: V,
    pub stored_at: Instant,
}

/// Signature-keyed cache with lazy TTL eviction.
pub struct CacheStore<V> {
    entries: moka::sync::Cache<RequestSignature, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store reading time from tokio's clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    /// Create a store with an injected clock.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: moka::sync::Cache::new(config.max_entries),
            ttl: config.ttl,
            clock,
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry.
    ///
    /// Returns `None` on a miss. An expired entry counts as a miss and is
    /// evicted before returning.
    pub fn get(&self, key: &RequestSignature) -> Option<CacheEntry<V>> {
        let resource = key.resource().to_owned();
        let Some(entry) = self.entries.get(key) else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "resource" => resource).increment(1);
            return None;
        };

        let age = self.clock.now().saturating_duration_since(entry.stored_at);
        if age > self.ttl {
            debug!(key = %key, age_ms = age.as_millis() as u64, "evicting expired cache entry");
            self.entries.invalidate(key);
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "resource" => resource).increment(1);
            return None;
        }

        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "resource" => resource).increment(1);
        Some(entry)
    }

    /// Insert (or overwrite) an entry, stamped with the current time.
    pub fn set(&self, key: RequestSignature, payload: V) {
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            stored_at: self.clock.now(),
        };
        self.entries.insert(key, entry);
    }

    /// Remove every entry whose signature starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let doomed: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| key.as_str().starts_with(prefix))
            .map(|(key, _)| key)
            .collect();
        for key in &doomed {
            self.entries.invalidate(key.as_ref());
        }
        doomed.len()
    }

    /// Remove a single entry.
    pub fn remove(&self, key: &RequestSignature) {
        self.entries.invalidate(key);
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of entries currently held, including not-yet-noticed expired ones.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
