//! Short-lived spending summary cache.
//!
//! Summaries are cheap to recompute from the expense cache, so this layer
//! is a small TTL cache that exists to absorb bursts of identical queries
//! from a refreshing UI. It is dropped wholesale on every invalidation;
//! there is no per-key surgery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use rust_decimal::Decimal;

use walletkit_shared::config::CacheConfig;

use crate::aggregate::{CategoryExpense, TimeCoordinate};

/// Identity of one cached summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    /// Resolved time window of the query.
    pub coordinate: TimeCoordinate,
    /// Base currency the summary is expressed in.
    pub currency: String,
}

/// A computed spending summary for one time window.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendingSummary {
    /// Sum of all category totals.
    pub total_spent: Decimal,
    /// Per-category breakdown.
    pub by_category: HashMap<String, CategoryExpense>,
    /// When this summary was computed.
    pub generated_at: DateTime<Utc>,
}

impl SpendingSummary {
    /// Builds a summary from per-category expenses.
    #[must_use]
    pub fn from_expenses(by_category: HashMap<String, CategoryExpense>) -> Self {
        let total_spent = by_category.values().map(|e| e.total).sum();
        Self {
            total_spent,
            by_category,
            generated_at: Utc::now(),
        }
    }
}

/// TTL cache of computed summaries.
pub struct SummaryCache {
    cache: Cache<SummaryKey, Arc<SpendingSummary>>,
}

impl SummaryCache {
    /// Creates a cache with the given capacity and time-to-live.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.summary_capacity)
            .time_to_live(Duration::from_secs(config.summary_ttl_secs))
            .build();
        Self { cache }
    }

    /// Looks up a cached summary.
    #[must_use]
    pub fn get(&self, key: &SummaryKey) -> Option<Arc<SpendingSummary>> {
        self.cache.get(key)
    }

    /// Caches a computed summary, returning the shared handle.
    pub fn store(&self, key: SummaryKey, summary: SpendingSummary) -> Arc<SpendingSummary> {
        let shared = Arc::new(summary);
        self.cache.insert(key, Arc::clone(&shared));
        shared
    }

    /// Drops every cached summary.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Number of cached summaries. Approximate until pending maintenance
    /// runs; tests call [`Self::run_pending_tasks`] first.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs moka's pending maintenance synchronously.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}
