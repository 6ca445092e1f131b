//! Side-channel notifications about cache activity.
//!
//! Observers are called from inside the pipeline but never influence it:
//! they return nothing and cannot fail. Implementations must be cheap and
//! must not block.

use std::sync::atomic::{AtomicU64, Ordering};

use diskcache_core::StoreError;

use crate::stats::CacheStats;

/// Receives cache events for a logical key.
pub trait CacheObserver: Send + Sync {
    /// A stored value passed validation and was emitted.
    fn on_cache_hit(&self, _key: &str) {}

    /// A stored record could not be read.
    fn on_cache_miss(&self, _key: &str, _cause: &StoreError) {}

    /// The entry for `key` was missing or invalid and has been cleaned up.
    fn on_cache_invalid(&self, _key: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CacheObserver for NoopObserver {}

/// Observer that turns events into `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_cache_hit(&self, key: &str) {
        tracing::debug!(target: "diskcache", key, "Cache hit");
    }

    fn on_cache_miss(&self, key: &str, cause: &StoreError) {
        tracing::warn!(target: "diskcache", key, error = %cause, "Cache miss");
    }

    fn on_cache_invalid(&self, key: &str) {
        tracing::debug!(target: "diskcache", key, "Cache invalid");
    }
}

/// Observer that counts events.
#[derive(Debug, Default)]
pub struct CountingObserver {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the counters. `entry_count` is not tracked and stays 0.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entry_count: 0,
        }
    }
}

impl CacheObserver for CountingObserver {
    fn on_cache_hit(&self, _key: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_cache_miss(&self, _key: &str, _cause: &StoreError) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn on_cache_invalid(&self, _key: &str) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_observer() {
        let observer = CountingObserver::new();

        observer.on_cache_hit("a");
        observer.on_cache_hit("b");
        observer.on_cache_miss("a", &StoreError::not_found("a"));
        observer.on_cache_invalid("a");

        let stats = observer.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.invalidations, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_default_observers_do_not_panic() {
        let err = StoreError::io("k", "boom");
        let observers: [&dyn CacheObserver; 2] = [&NoopObserver, &TracingObserver];
        for observer in observers {
            observer.on_cache_hit("k");
            observer.on_cache_miss("k", &err);
            observer.on_cache_invalid("k");
        }
    }
}
