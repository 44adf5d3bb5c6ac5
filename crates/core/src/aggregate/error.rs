//! Aggregation error types.

use thiserror::Error;

use crate::store::StoreError;

/// Aggregation read-path errors.
///
/// The incremental write path never surfaces errors; only the read
/// operations (`fetch_monthly` and friends) propagate store failures.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The persistent store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AggregateError> for walletkit_shared::AppError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::Store(inner) => inner.into(),
        }
    }
}
