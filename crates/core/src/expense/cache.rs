//! In-memory LRU mirror of the aggregate record set.
//!
//! Expense queries are served from this cache without touching the durable
//! store. The current year and the all-time bucket are loaded at startup;
//! other years are pulled in lazily when a query needs them, and a strict
//! LRU policy bounds residency. Mutation deltas are applied synchronously
//! so reads issued right after a write see the new totals, even while the
//! durable write is still queued behind the writer task.

use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use lru::LruCache;
use tracing::{debug, warn};

use walletkit_shared::config::CacheConfig;
use walletkit_shared::types::Transaction;

use crate::aggregate::{
    AggregateKey, AggregateRecord, AggregationService, CategoryExpense, TimeFilter,
};
use crate::metrics::ExpenseCacheMetrics;
use crate::store::AggregateStore;

use super::types::ExpenseLookup;

struct ExpenseCacheInner {
    entries: LruCache<AggregateKey, AggregateRecord>,
    /// Years whose records are resident (0 is the all-time bucket).
    loaded_years: HashSet<i32>,
    /// False until the initial load; queries before that answer `NotLoaded`.
    loaded: bool,
    /// Recent query target years, newest at the back.
    access_log: VecDeque<(i32, DateTime<Utc>)>,
}

impl ExpenseCacheInner {
    fn insert(&mut self, record: AggregateRecord, metrics: &ExpenseCacheMetrics) {
        let key = record.key.clone();
        if let Some((displaced, _)) = self.entries.push(key.clone(), record) {
            // `push` hands back the old value on overwrite and the LRU
            // victim on overflow; only the latter is an eviction.
            if displaced != key {
                metrics.record_eviction();
            }
        }
    }
}

/// Strict-LRU cache of aggregate records keyed by bucket identity.
pub struct CategoryExpenseCache {
    store: Arc<dyn AggregateStore>,
    inner: Mutex<ExpenseCacheInner>,
    metrics: Arc<ExpenseCacheMetrics>,
    access_log_len: usize,
    prefetch_window: usize,
}

impl CategoryExpenseCache {
    /// Creates an empty cache with the given tuning.
    #[must_use]
    pub fn new(store: Arc<dyn AggregateStore>, config: &CacheConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.expense_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            inner: Mutex::new(ExpenseCacheInner {
                entries: LruCache::new(capacity),
                loaded_years: HashSet::new(),
                loaded: false,
                access_log: VecDeque::new(),
            }),
            metrics: Arc::new(ExpenseCacheMetrics::default()),
            access_log_len: config.access_log_len,
            prefetch_window: config.prefetch_window,
        }
    }

    /// Cache hit/miss/eviction counters.
    #[must_use]
    pub fn metrics(&self) -> &Arc<ExpenseCacheMetrics> {
        &self.metrics
    }

    fn lock(&self) -> MutexGuard<'_, ExpenseCacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of resident aggregate records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if no records are resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initial population: loads the current year and the all-time bucket.
    ///
    /// Idempotent. On store failure the cache stays cold and queries keep
    /// answering `NotLoaded`.
    pub async fn load_from_store(&self, today: NaiveDate) {
        if self.lock().loaded {
            return;
        }

        let current_year = today.year();
        let (current, all_time) = match (
            self.store.fetch_year(current_year).await,
            self.store.fetch_year(0).await,
        ) {
            (Ok(current), Ok(all_time)) => (current, all_time),
            (Err(error), _) | (_, Err(error)) => {
                warn!(%error, "expense cache initial load failed, staying cold");
                return;
            }
        };

        let mut inner = self.lock();
        for record in current.into_iter().chain(all_time) {
            inner.insert(record, &self.metrics);
        }
        inner.loaded_years.insert(current_year);
        inner.loaded_years.insert(0);
        inner.loaded = true;
        debug!(%current_year, entries = inner.entries.len(), "expense cache loaded");
    }

    /// Loads one year's records if they are not already resident.
    ///
    /// Store failures are logged and leave the year unloaded, so a later
    /// query retries.
    pub async fn ensure_year_loaded(&self, year: i32) {
        if self.lock().loaded_years.contains(&year) {
            return;
        }

        let records = match self.store.fetch_year(year).await {
            Ok(records) => records,
            Err(error) => {
                warn!(%year, %error, "expense cache year load failed");
                return;
            }
        };

        let mut inner = self.lock();
        for record in records {
            inner.insert(record, &self.metrics);
        }
        inner.loaded_years.insert(year);
    }

    /// Serves an expense query from the resident records.
    ///
    /// Returns [`ExpenseLookup::NotLoaded`] when the initial load has not
    /// happened; otherwise lazily loads the year the filter resolves to,
    /// records the access for the prefetch heuristic, and folds matching
    /// records into per-category results. When `known_categories` is given,
    /// only those categories are reported, so records for deleted
    /// categories age out of view immediately; `None` reports every
    /// resident category.
    pub async fn get_category_expenses(
        self: &Arc<Self>,
        filter: TimeFilter,
        base_currency: &str,
        known_categories: Option<&HashSet<String>>,
    ) -> ExpenseLookup {
        let today = Utc::now().date_naive();
        if !self.lock().loaded {
            self.metrics.record_miss();
            return ExpenseLookup::NotLoaded;
        }

        let coordinate = filter.resolve(today);
        let target_year = coordinate.load_year(today);
        self.record_access(target_year);
        self.ensure_year_loaded(target_year).await;
        self.maybe_prefetch(today.year());

        let mut results: HashMap<String, CategoryExpense> = HashMap::new();
        let inner = self.lock();
        for (key, record) in inner.entries.iter() {
            if record.currency == base_currency
                && coordinate.matches(key)
                && known_categories.is_none_or(|names| names.contains(&key.category))
            {
                results.entry(key.category.clone()).or_default().absorb(record);
            }
        }
        drop(inner);

        self.metrics.record_hit();
        ExpenseLookup::Loaded(results)
    }

    fn record_access(&self, year: i32) {
        let mut inner = self.lock();
        inner.access_log.push_back((year, Utc::now()));
        while inner.access_log.len() > self.access_log_len {
            inner.access_log.pop_front();
        }
    }

    /// Schedules a background load of the previous year when the recent
    /// accesses span more than one year.
    fn maybe_prefetch(self: &Arc<Self>, current_year: i32) {
        let target = {
            let inner = self.lock();
            match prefetch_target(&inner.access_log, self.prefetch_window, current_year) {
                Some(year) if !inner.loaded_years.contains(&year) => Some(year),
                _ => None,
            }
        };
        if let Some(year) = target {
            self.metrics.record_prefetch();
            let cache = Arc::clone(self);
            tokio::spawn(async move {
                cache.ensure_year_loaded(year).await;
            });
        }
    }

    /// Applies mutation deltas to the resident records, synchronously.
    ///
    /// Resident buckets are merged in place; new buckets are created only
    /// for loaded years. Deltas for unloaded years are dropped: inserting
    /// them would be overwritten by the store load when that year is first
    /// requested, and the durable write carries the same delta anyway. The
    /// cost is a weaker read-your-write guarantee for unloaded years: a
    /// query against such a year sees the mutation only once its durable
    /// write lands, not immediately. Loaded years (always including the
    /// current year and the all-time bucket) keep the immediate guarantee.
    pub fn apply_deltas(&self, deltas: &[AggregateRecord]) {
        let mut inner = self.lock();
        if !inner.loaded {
            return;
        }
        for delta in deltas {
            if inner.entries.contains(&delta.key) {
                if let Some(existing) = inner.entries.get_mut(&delta.key) {
                    existing.merge_delta(delta);
                }
            } else if inner.loaded_years.contains(&delta.key.year) {
                let mut record = delta.clone();
                record.transaction_count = record.transaction_count.max(0);
                inner.insert(record, &self.metrics);
            }
        }
    }

    /// Drops every resident record belonging to the named categories.
    pub fn invalidate_categories(&self, categories: &[String]) {
        let mut inner = self.lock();
        let doomed: Vec<AggregateKey> = inner
            .entries
            .iter()
            .filter(|(key, _)| categories.contains(&key.category))
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            inner.entries.pop(&key);
        }
    }

    /// Drops all state, returning the cache to cold.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.loaded_years.clear();
        inner.access_log.clear();
        inner.loaded = false;
    }

    /// Rebuilds the cache (and the durable records) from the full
    /// transaction history.
    ///
    /// The resident set is replaced with the current year and all-time
    /// buckets; the complete record set is handed to the aggregation
    /// writer for durable replacement.
    pub fn rebuild_from_transactions(
        &self,
        transactions: &[Transaction],
        base_currency: &str,
        aggregation: &AggregationService,
    ) {
        let today = Utc::now().date_naive();
        let records = aggregation.build_aggregates(transactions, base_currency);

        let mut inner = self.lock();
        inner.entries.clear();
        inner.loaded_years.clear();
        for record in &records {
            if record.key.year == today.year() || record.key.year == 0 {
                inner.insert(record.clone(), &self.metrics);
            }
        }
        inner.loaded_years.insert(today.year());
        inner.loaded_years.insert(0);
        inner.loaded = true;
        drop(inner);

        aggregation.rebuild_with(records);
    }
}

/// Decides whether the recent access pattern justifies prefetching the
/// previous year.
///
/// Fires when the last `window` accesses touch more than one distinct
/// calendar year. All-time accesses (year 0) are not calendar years and
/// never count toward the distinct set.
fn prefetch_target(
    access_log: &VecDeque<(i32, DateTime<Utc>)>,
    window: usize,
    current_year: i32,
) -> Option<i32> {
    if window == 0 {
        return None;
    }
    let mut years = HashSet::new();
    for (year, _) in access_log.iter().rev().take(window) {
        if *year > 0 {
            years.insert(*year);
        }
    }
    (years.len() > 1).then_some(current_year - 1)
}
