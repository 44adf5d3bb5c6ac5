//! Narrow async interfaces to the persistent record store.
//!
//! The embedded database itself is an external collaborator; the services in
//! this crate reach it only through these traits. Implementations must give
//! each call transactional visibility: a read issued after an `upsert`
//! completes sees the written record, but callers of the fire-and-forget
//! update paths must not assume synchronous visibility of writes that are
//! still queued behind the writer task.

use async_trait::async_trait;
use thiserror::Error;

use crate::aggregate::{AggregateKey, AggregateRecord};
use crate::budget::SpendingCacheEntry;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent store failures.
///
/// These are transient by classification: the services log and swallow them,
/// leaving in-memory caches at their last-known-good state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend rejected or failed the operation.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for walletkit_shared::AppError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

/// Durable aggregate record access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Fetches a single aggregate record by key.
    async fn fetch(&self, key: &AggregateKey) -> StoreResult<Option<AggregateRecord>>;

    /// Fetches every aggregate record for the given year.
    ///
    /// Year `0` selects the all-time bucket.
    async fn fetch_year(&self, year: i32) -> StoreResult<Vec<AggregateRecord>>;

    /// Fetches all aggregate records.
    async fn fetch_all(&self) -> StoreResult<Vec<AggregateRecord>>;

    /// Creates or replaces the record identified by `record.key`.
    async fn upsert(&self, record: AggregateRecord) -> StoreResult<()>;

    /// Deletes every aggregate record. Used only by full rebuilds.
    async fn delete_all(&self) -> StoreResult<()>;
}

/// Durable budget spending cache access, one entry per budgeted category.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpendingStore: Send + Sync {
    /// Fetches the spending cache entry for a category.
    async fn fetch_spending(&self, category: &str) -> StoreResult<Option<SpendingCacheEntry>>;

    /// Creates or replaces the spending cache entry for a category.
    async fn save_spending(&self, category: &str, entry: SpendingCacheEntry) -> StoreResult<()>;
}

#[cfg(test)]
pub(crate) mod testutil {
    //! A plain in-memory `AggregateStore` for unit tests that need real
    //! read-back behavior rather than mock expectations.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{AggregateStore, StoreResult};
    use crate::aggregate::{AggregateKey, AggregateRecord};
    use async_trait::async_trait;

    #[derive(Default)]
    pub struct StubAggregateStore {
        records: Mutex<HashMap<AggregateKey, AggregateRecord>>,
    }

    impl StubAggregateStore {
        pub fn with_records(records: Vec<AggregateRecord>) -> Self {
            let store = Self::default();
            {
                let mut map = store.records.lock().unwrap();
                for record in records {
                    map.insert(record.key.clone(), record);
                }
            }
            store
        }

        pub fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AggregateStore for StubAggregateStore {
        async fn fetch(&self, key: &AggregateKey) -> StoreResult<Option<AggregateRecord>> {
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        async fn fetch_year(&self, year: i32) -> StoreResult<Vec<AggregateRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.key.year == year)
                .cloned()
                .collect())
        }

        async fn fetch_all(&self) -> StoreResult<Vec<AggregateRecord>> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }

        async fn upsert(&self, record: AggregateRecord) -> StoreResult<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.key.clone(), record);
            Ok(())
        }

        async fn delete_all(&self) -> StoreResult<()> {
            self.records.lock().unwrap().clear();
            Ok(())
        }
    }
}
