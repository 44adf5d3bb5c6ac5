//! Budget spending cache types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Durable cached spend for one budgeted category.
///
/// Valid only when the currency matches the base currency and `updated_at`
/// is inside the current budget period; every other combination is read as
/// a cache miss, never as zero spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingCacheEntry {
    /// Cached spend for the current budget period.
    pub amount: Decimal,
    /// Currency `amount` is expressed in.
    pub currency: String,
    /// When the cache was last written. `None` marks an invalidated entry.
    pub updated_at: Option<DateTime<Utc>>,
}

impl SpendingCacheEntry {
    /// A freshly written entry stamped now.
    #[must_use]
    pub fn fresh(amount: Decimal, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
            updated_at: Some(Utc::now()),
        }
    }

    /// The invalidated form of this entry: zero amount, no timestamp.
    #[must_use]
    pub fn invalidated(&self) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: self.currency.clone(),
            updated_at: None,
        }
    }
}
