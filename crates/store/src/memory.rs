//! In-process record store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use walletkit_core::aggregate::{AggregateKey, AggregateRecord};
use walletkit_core::budget::SpendingCacheEntry;
use walletkit_core::store::{AggregateStore, SpendingStore, StoreError, StoreResult};

/// In-memory implementation of both store traits.
///
/// Writes can be made to fail on demand, which is how the degradation
/// paths (logged-and-swallowed write failures, rebuild self-healing) are
/// exercised in tests.
#[derive(Default)]
pub struct MemoryStore {
    aggregates: RwLock<HashMap<AggregateKey, AggregateRecord>>,
    spending: RwLock<HashMap<String, SpendingCacheEntry>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every write fails with a backend error until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".to_string()));
        }
        Ok(())
    }

    /// Number of stored aggregate records.
    pub async fn aggregate_count(&self) -> usize {
        self.aggregates.read().await.len()
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn fetch(&self, key: &AggregateKey) -> StoreResult<Option<AggregateRecord>> {
        Ok(self.aggregates.read().await.get(key).cloned())
    }

    async fn fetch_year(&self, year: i32) -> StoreResult<Vec<AggregateRecord>> {
        Ok(self
            .aggregates
            .read()
            .await
            .values()
            .filter(|record| record.key.year == year)
            .cloned()
            .collect())
    }

    async fn fetch_all(&self) -> StoreResult<Vec<AggregateRecord>> {
        Ok(self.aggregates.read().await.values().cloned().collect())
    }

    async fn upsert(&self, record: AggregateRecord) -> StoreResult<()> {
        self.check_writable()?;
        self.aggregates
            .write()
            .await
            .insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.check_writable()?;
        self.aggregates.write().await.clear();
        Ok(())
    }
}

#[async_trait]
impl SpendingStore for MemoryStore {
    async fn fetch_spending(&self, category: &str) -> StoreResult<Option<SpendingCacheEntry>> {
        Ok(self.spending.read().await.get(category).cloned())
    }

    async fn save_spending(&self, category: &str, entry: SpendingCacheEntry) -> StoreResult<()> {
        self.check_writable()?;
        self.spending
            .write()
            .await
            .insert(category.to_string(), entry);
        Ok(())
    }
}
