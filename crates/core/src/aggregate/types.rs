//! Aggregate record types and time filters.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identity of one aggregate bucket.
///
/// The year/month pair encodes the granularity: `(0, 0)` is the all-time
/// bucket, `(year, 0)` with `year > 0` is a yearly bucket, and `(year,
/// month)` with both positive is a monthly bucket. A key with a subcategory
/// tracks that subcategory's share; the matching `subcategory: None` key
/// carries the category-level total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregateKey {
    /// Category name.
    pub category: String,
    /// Optional subcategory name.
    pub subcategory: Option<String>,
    /// Calendar year, or 0 for the all-time bucket.
    pub year: i32,
    /// Calendar month (1-12), or 0 for yearly/all-time buckets.
    pub month: u32,
}

impl AggregateKey {
    /// Key for a monthly bucket.
    #[must_use]
    pub fn monthly(category: &str, subcategory: Option<&str>, year: i32, month: u32) -> Self {
        Self {
            category: category.to_string(),
            subcategory: subcategory.map(str::to_string),
            year,
            month,
        }
    }

    /// Key for a yearly bucket.
    #[must_use]
    pub fn yearly(category: &str, subcategory: Option<&str>, year: i32) -> Self {
        Self::monthly(category, subcategory, year, 0)
    }

    /// Key for the all-time bucket.
    #[must_use]
    pub fn all_time(category: &str, subcategory: Option<&str>) -> Self {
        Self::monthly(category, subcategory, 0, 0)
    }

    /// Returns the granularity encoded by this key.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        match (self.year, self.month) {
            (0, _) => Granularity::AllTime,
            (_, 0) => Granularity::Yearly,
            _ => Granularity::Monthly,
        }
    }
}

/// Aggregate bucket granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One calendar month.
    Monthly,
    /// One calendar year.
    Yearly,
    /// Everything ever recorded.
    AllTime,
}

/// A durable running total for one aggregate bucket.
///
/// Also used as the delta unit flowing from the mutation hooks into the
/// writer task and the in-memory mirror: a delta is a record whose amount
/// and count are adjustments rather than absolute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Bucket identity.
    pub key: AggregateKey,
    /// Running total in `currency`.
    pub total_amount: Decimal,
    /// Number of contributing transactions.
    ///
    /// Maintained by sign-of-delta adjustments, so it is approximate when a
    /// transaction's amount is partially adjusted rather than fully
    /// reversed and reapplied. Clamped to be non-negative.
    pub transaction_count: i64,
    /// Currency the total is expressed in (the base currency at write time).
    pub currency: String,
    /// When this record was last touched.
    pub last_updated: DateTime<Utc>,
}

impl AggregateRecord {
    /// Creates a record (or delta) for the given bucket.
    #[must_use]
    pub fn new(key: AggregateKey, total_amount: Decimal, transaction_count: i64, currency: &str) -> Self {
        Self {
            key,
            total_amount,
            transaction_count,
            currency: currency.to_string(),
            last_updated: Utc::now(),
        }
    }

    /// Folds a delta into this record in place.
    ///
    /// The count is clamped at zero; concurrent over-decrements must never
    /// produce a negative count.
    pub fn merge_delta(&mut self, delta: &AggregateRecord) {
        self.total_amount += delta.total_amount;
        self.transaction_count = (self.transaction_count + delta.transaction_count).max(0);
        if delta.last_updated > self.last_updated {
            self.last_updated = delta.last_updated;
        }
    }
}

/// Aggregated spending for one category over a requested time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryExpense {
    /// Category-level total.
    pub total: Decimal,
    /// Number of contributing transactions (approximate, see
    /// [`AggregateRecord::transaction_count`]).
    pub transaction_count: i64,
    /// Per-subcategory totals.
    pub subcategories: HashMap<String, Decimal>,
}

impl CategoryExpense {
    /// Folds one aggregate record into this result.
    pub fn absorb(&mut self, record: &AggregateRecord) {
        match &record.key.subcategory {
            None => {
                self.total += record.total_amount;
                self.transaction_count += record.transaction_count;
            }
            Some(sub) => {
                *self.subcategories.entry(sub.clone()).or_default() += record.total_amount;
            }
        }
    }
}

/// Time window requested by an expense query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFilter {
    /// Everything ever recorded.
    AllTime,
    /// The month containing today.
    ThisMonth,
    /// The month before the one containing today.
    LastMonth,
    /// The year containing today.
    ThisYear,
    /// An arbitrary date range.
    Custom {
        /// Inclusive range start.
        start: NaiveDate,
        /// Inclusive range end.
        end: NaiveDate,
    },
}

impl TimeFilter {
    /// Resolves this filter to an aggregate bucket coordinate relative to
    /// `today`.
    ///
    /// Custom ranges resolve to [`TimeCoordinate::AnyMonthly`]: the cache
    /// matches every monthly bucket and the caller is responsible for any
    /// further exact-date filtering.
    #[must_use]
    pub fn resolve(&self, today: NaiveDate) -> TimeCoordinate {
        match self {
            Self::AllTime => TimeCoordinate::AllTime,
            Self::ThisMonth => TimeCoordinate::Month {
                year: today.year(),
                month: today.month(),
            },
            Self::LastMonth => {
                let prev = today - Months::new(1);
                TimeCoordinate::Month {
                    year: prev.year(),
                    month: prev.month(),
                }
            }
            Self::ThisYear => TimeCoordinate::Year(today.year()),
            Self::Custom { .. } => TimeCoordinate::AnyMonthly,
        }
    }
}

/// A resolved aggregate bucket coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeCoordinate {
    /// The all-time bucket.
    AllTime,
    /// One monthly bucket.
    Month {
        /// Calendar year.
        year: i32,
        /// Calendar month (1-12).
        month: u32,
    },
    /// One yearly bucket.
    Year(i32),
    /// Every monthly bucket, for filters the bucket scheme cannot express.
    AnyMonthly,
}

impl TimeCoordinate {
    /// Returns true if the given key falls inside this coordinate.
    #[must_use]
    pub fn matches(&self, key: &AggregateKey) -> bool {
        match self {
            Self::AllTime => key.year == 0 && key.month == 0,
            Self::Month { year, month } => key.year == *year && key.month == *month,
            Self::Year(year) => key.year == *year && key.month == 0,
            Self::AnyMonthly => key.year > 0 && key.month > 0,
        }
    }

    /// The year whose records should be resident to answer queries at this
    /// coordinate. Year 0 selects the all-time bucket.
    #[must_use]
    pub fn load_year(&self, today: NaiveDate) -> i32 {
        match self {
            Self::AllTime => 0,
            Self::Month { year, .. } | Self::Year(year) => *year,
            Self::AnyMonthly => today.year(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_key_granularities() {
        assert_eq!(
            AggregateKey::monthly("Food", None, 2024, 3).granularity(),
            Granularity::Monthly
        );
        assert_eq!(
            AggregateKey::yearly("Food", None, 2024).granularity(),
            Granularity::Yearly
        );
        assert_eq!(
            AggregateKey::all_time("Food", None).granularity(),
            Granularity::AllTime
        );
    }

    #[test]
    fn test_subcategory_distinguishes_keys() {
        let plain = AggregateKey::monthly("Food", None, 2024, 3);
        let sub = AggregateKey::monthly("Food", Some("Groceries"), 2024, 3);
        assert_ne!(plain, sub);
    }

    #[rstest]
    #[case(TimeFilter::AllTime, TimeCoordinate::AllTime)]
    #[case(TimeFilter::ThisMonth, TimeCoordinate::Month { year: 2024, month: 3 })]
    #[case(TimeFilter::LastMonth, TimeCoordinate::Month { year: 2024, month: 2 })]
    #[case(TimeFilter::ThisYear, TimeCoordinate::Year(2024))]
    fn test_filter_resolution(#[case] filter: TimeFilter, #[case] expected: TimeCoordinate) {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(filter.resolve(today), expected);
    }

    #[test]
    fn test_last_month_across_year_boundary() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(
            TimeFilter::LastMonth.resolve(today),
            TimeCoordinate::Month {
                year: 2023,
                month: 12
            }
        );
    }

    #[test]
    fn test_custom_filter_matches_any_monthly() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let coord = TimeFilter::Custom { start, end }.resolve(end);

        assert_eq!(coord, TimeCoordinate::AnyMonthly);
        assert!(coord.matches(&AggregateKey::monthly("Food", None, 2020, 7)));
        assert!(!coord.matches(&AggregateKey::yearly("Food", None, 2020)));
        assert!(!coord.matches(&AggregateKey::all_time("Food", None)));
    }

    #[test]
    fn test_merge_delta_clamps_count() {
        use rust_decimal_macros::dec;

        let key = AggregateKey::monthly("Food", None, 2024, 3);
        let mut record = AggregateRecord::new(key.clone(), dec!(10), 0, "USD");
        let delta = AggregateRecord::new(key, dec!(-10), -1, "USD");
        record.merge_delta(&delta);

        assert_eq!(record.total_amount, dec!(0));
        assert_eq!(record.transaction_count, 0);
    }

    #[test]
    fn test_absorb_splits_subcategories() {
        use rust_decimal_macros::dec;

        let mut expense = CategoryExpense::default();
        expense.absorb(&AggregateRecord::new(
            AggregateKey::monthly("Food", None, 2024, 3),
            dec!(150),
            2,
            "USD",
        ));
        expense.absorb(&AggregateRecord::new(
            AggregateKey::monthly("Food", Some("Groceries"), 2024, 3),
            dec!(100),
            1,
            "USD",
        ));

        assert_eq!(expense.total, dec!(150));
        assert_eq!(expense.transaction_count, 2);
        assert_eq!(expense.subcategories["Groceries"], dec!(100));
    }
}
