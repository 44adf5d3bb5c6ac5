//! Counters exposing background failure rates to embedders.
//!
//! The aggregation layer deliberately trades consistency for availability:
//! durable-write failures are logged and swallowed. These counters are the
//! hook that lets an embedder notice accumulating divergence and schedule a
//! proactive rebuild.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the aggregation service's background writer.
#[derive(Debug, Default)]
pub struct AggregationMetrics {
    deltas_applied: AtomicU64,
    write_failures: AtomicU64,
    rebuilds: AtomicU64,
}

impl AggregationMetrics {
    /// Records a successfully persisted aggregate delta.
    pub fn record_delta_applied(&self) {
        self.deltas_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a swallowed durable-write failure.
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed full rebuild.
    pub fn record_rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> AggregationMetricsSnapshot {
        AggregationMetricsSnapshot {
            deltas_applied: self.deltas_applied.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`AggregationMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationMetricsSnapshot {
    /// Deltas persisted by the writer task.
    pub deltas_applied: u64,
    /// Durable-write failures that were logged and swallowed.
    pub write_failures: u64,
    /// Full rebuilds completed.
    pub rebuilds: u64,
}

/// Counters for the category expense LRU cache.
#[derive(Debug, Default)]
pub struct ExpenseCacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    prefetches: AtomicU64,
}

impl ExpenseCacheMetrics {
    /// Records a query served from the loaded cache.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a query against an unloaded cache.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an LRU eviction.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a speculative year prefetch being scheduled.
    pub fn record_prefetch(&self) {
        self.prefetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> ExpenseCacheMetricsSnapshot {
        ExpenseCacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            prefetches: self.prefetches.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`ExpenseCacheMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpenseCacheMetricsSnapshot {
    /// Queries served from the loaded cache.
    pub hits: u64,
    /// Queries answered `NotLoaded`.
    pub misses: u64,
    /// Entries evicted by the LRU policy.
    pub evictions: u64,
    /// Speculative year prefetches scheduled.
    pub prefetches: u64,
}
