//! Incremental budget spending cache.
//!
//! Keeps a durable per-category running total for the current budget
//! period so progress bars never rescan the transaction history. Writes
//! are incremental on every transaction mutation; reads validate the
//! entry's currency and freshness and report a miss rather than a wrong
//! number when either check fails.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use walletkit_shared::types::{Category, Transaction};

use crate::currency::{resolve_base_amount, CurrencyConverter};
use crate::store::SpendingStore;

use super::period::period_start;
use super::types::SpendingCacheEntry;

/// Maintains cached per-category spending for the current budget period.
///
/// Store failures are logged and swallowed: a broken cache write degrades
/// to a slower read later, never to a failed transaction mutation.
pub struct BudgetSpendingService {
    store: Arc<dyn SpendingStore>,
    converter: Arc<dyn CurrencyConverter>,
}

impl BudgetSpendingService {
    /// Creates a service over the given spending store.
    #[must_use]
    pub fn new(store: Arc<dyn SpendingStore>, converter: Arc<dyn CurrencyConverter>) -> Self {
        Self { store, converter }
    }

    /// Whether `tx` counts toward the budget window starting at
    /// `window_start`.
    fn in_window(tx: &Transaction, window_start: NaiveDate, today: NaiveDate) -> bool {
        tx.is_aggregatable_expense() && tx.date >= window_start && tx.date <= today
    }

    /// Reports an added transaction.
    pub async fn apply_added(&self, tx: &Transaction, base_currency: &str, window_start: NaiveDate) {
        let today = Utc::now().date_naive();
        if !Self::in_window(tx, window_start, today) {
            return;
        }
        let amount = resolve_base_amount(tx, base_currency, self.converter.as_ref());
        self.adjust(&tx.category, amount, base_currency).await;
    }

    /// Reports a deleted transaction.
    pub async fn apply_deleted(
        &self,
        tx: &Transaction,
        base_currency: &str,
        window_start: NaiveDate,
    ) {
        let today = Utc::now().date_naive();
        if !Self::in_window(tx, window_start, today) {
            return;
        }
        let amount = resolve_base_amount(tx, base_currency, self.converter.as_ref());
        self.adjust(&tx.category, -amount, base_currency).await;
    }

    /// Reports an edited transaction as a delete of the old version plus an
    /// add of the new, which also handles category and date moves.
    pub async fn apply_updated(
        &self,
        old: &Transaction,
        new: &Transaction,
        base_currency: &str,
        window_start: NaiveDate,
    ) {
        self.apply_deleted(old, base_currency, window_start).await;
        self.apply_added(new, base_currency, window_start).await;
    }

    /// Applies a signed delta to a category's cached spend.
    ///
    /// An entry in a different currency is replaced rather than mixed:
    /// the delta becomes the new total and the stale amount is discarded.
    async fn adjust(&self, category: &str, delta: Decimal, base_currency: &str) {
        let existing = match self.store.fetch_spending(category).await {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%category, %error, "spending cache read failed, skipping update");
                return;
            }
        };

        let amount = match existing {
            Some(entry) if entry.currency == base_currency => entry.amount + delta,
            _ => delta,
        };

        if let Err(error) = self
            .store
            .save_spending(category, SpendingCacheEntry::fresh(amount, base_currency))
            .await
        {
            warn!(%category, %error, "spending cache write failed");
        }
    }

    /// Reads the cached spend for a category, if the entry is usable.
    ///
    /// Misses when there is no entry, the currency differs from
    /// `base_currency`, or the entry predates `window_start` (a new budget
    /// period started since the last write). Hits are clamped to zero so
    /// refunds never report negative spending.
    pub async fn cached_spent(
        &self,
        category: &str,
        base_currency: &str,
        window_start: NaiveDate,
    ) -> Option<Decimal> {
        let entry = match self.store.fetch_spending(category).await {
            Ok(entry) => entry?,
            Err(error) => {
                warn!(%category, %error, "spending cache read failed, treating as miss");
                return None;
            }
        };

        if entry.currency != base_currency {
            return None;
        }
        let updated_at = entry.updated_at?;
        let window_start_at = window_start.and_hms_opt(0, 0, 0)?.and_utc();
        if updated_at < window_start_at {
            return None;
        }

        Some(entry.amount.max(Decimal::ZERO))
    }

    /// Invalidates a category's cached spend.
    ///
    /// The entry is zeroed and its timestamp cleared, so the next read
    /// misses and recomputes instead of trusting a stale total.
    pub async fn invalidate(&self, category: &str) {
        let existing = match self.store.fetch_spending(category).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(error) => {
                warn!(%category, %error, "spending cache read failed, skipping invalidation");
                return;
            }
        };

        if let Err(error) = self
            .store
            .save_spending(category, existing.invalidated())
            .await
        {
            warn!(%category, %error, "spending cache invalidation write failed");
        }
    }

    /// Recomputes and rewrites the cached spend for every budgeted
    /// category from the full transaction history.
    pub async fn rebuild(
        &self,
        transactions: &[Transaction],
        categories: &[Category],
        base_currency: &str,
    ) {
        let today = Utc::now().date_naive();
        for category in categories.iter().filter(|c| c.is_budgeted()) {
            let Some(frequency) = category.budget_frequency else {
                continue;
            };
            let window_start = period_start(frequency, today);
            let spent = self.period_spent(
                &category.name,
                transactions,
                base_currency,
                window_start,
                today,
            );
            if let Err(error) = self
                .store
                .save_spending(
                    &category.name,
                    SpendingCacheEntry::fresh(spent, base_currency),
                )
                .await
            {
                warn!(category = %category.name, %error, "spending cache rebuild write failed");
            }
        }
    }

    /// Sums a category's expenses inside a budget window, in the base
    /// currency. This is the slow path the cache exists to avoid.
    #[must_use]
    pub fn period_spent(
        &self,
        category: &str,
        transactions: &[Transaction],
        base_currency: &str,
        window_start: NaiveDate,
        today: NaiveDate,
    ) -> Decimal {
        transactions
            .iter()
            .filter(|tx| tx.category == category && Self::in_window(tx, window_start, today))
            .map(|tx| resolve_base_amount(tx, base_currency, self.converter.as_ref()))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;
    use uuid::Uuid;
    use walletkit_shared::types::{BudgetFrequency, TransactionKind};

    use crate::currency::FixedRateConverter;
    use crate::store::MockSpendingStore;

    fn expense(category: &str, amount: Decimal, date: NaiveDate) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            kind: TransactionKind::Expense,
            category: category.to_string(),
            subcategory: None,
            amount,
            currency: "USD".to_string(),
            converted_amount: None,
            date,
            note: None,
        }
    }

    fn service(store: MockSpendingStore) -> BudgetSpendingService {
        BudgetSpendingService::new(Arc::new(store), Arc::new(FixedRateConverter::default()))
    }

    fn window() -> NaiveDate {
        Utc::now().date_naive() - Duration::days(7)
    }

    #[tokio::test]
    async fn test_added_expense_creates_entry() {
        let today = Utc::now().date_naive();
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .with(eq("groceries"))
            .returning(|_| Ok(None));
        store
            .expect_save_spending()
            .withf(|category, entry| {
                category == "groceries"
                    && entry.amount == dec!(42.50)
                    && entry.currency == "USD"
                    && entry.updated_at.is_some()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        service(store)
            .apply_added(&expense("groceries", dec!(42.50), today), "USD", window())
            .await;
    }

    #[tokio::test]
    async fn test_added_expense_accumulates() {
        let today = Utc::now().date_naive();
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .returning(|_| Ok(Some(SpendingCacheEntry::fresh(dec!(100), "USD"))));
        store
            .expect_save_spending()
            .withf(|_, entry| entry.amount == dec!(130))
            .times(1)
            .returning(|_, _| Ok(()));

        service(store)
            .apply_added(&expense("groceries", dec!(30), today), "USD", window())
            .await;
    }

    #[tokio::test]
    async fn test_deleted_expense_subtracts() {
        let today = Utc::now().date_naive();
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .returning(|_| Ok(Some(SpendingCacheEntry::fresh(dec!(100), "USD"))));
        store
            .expect_save_spending()
            .withf(|_, entry| entry.amount == dec!(70))
            .times(1)
            .returning(|_, _| Ok(()));

        service(store)
            .apply_deleted(&expense("groceries", dec!(30), today), "USD", window())
            .await;
    }

    #[tokio::test]
    async fn test_income_and_out_of_window_are_ignored() {
        let today = Utc::now().date_naive();
        // The mock panics on any unexpected call, so no expectations means
        // the store must never be touched.
        let store = MockSpendingStore::new();
        let service = service(store);

        let mut income = expense("salary", dec!(5000), today);
        income.kind = TransactionKind::Income;
        service.apply_added(&income, "USD", window()).await;

        let old = expense("groceries", dec!(10), today - Duration::days(40));
        service.apply_added(&old, "USD", window()).await;

        let future = expense("groceries", dec!(10), today + Duration::days(3));
        service.apply_added(&future, "USD", window()).await;
    }

    #[tokio::test]
    async fn test_currency_mismatch_replaces_entry() {
        let today = Utc::now().date_naive();
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .returning(|_| Ok(Some(SpendingCacheEntry::fresh(dec!(900), "EUR"))));
        store
            .expect_save_spending()
            .withf(|_, entry| entry.amount == dec!(25) && entry.currency == "USD")
            .times(1)
            .returning(|_, _| Ok(()));

        service(store)
            .apply_added(&expense("groceries", dec!(25), today), "USD", window())
            .await;
    }

    #[tokio::test]
    async fn test_cached_spent_hit() {
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .returning(|_| Ok(Some(SpendingCacheEntry::fresh(dec!(64), "USD"))));

        let spent = service(store).cached_spent("groceries", "USD", window()).await;
        assert_eq!(spent, Some(dec!(64)));
    }

    #[tokio::test]
    async fn test_cached_spent_misses_after_period_rollover() {
        // Entry written before the current window started.
        let stale = SpendingCacheEntry {
            amount: dec!(64),
            currency: "USD".to_string(),
            updated_at: Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()),
        };
        let mut store = MockSpendingStore::new();
        store.expect_fetch_spending().returning(move |_| Ok(Some(stale.clone())));

        let spent = service(store).cached_spent("groceries", "USD", window()).await;
        assert_eq!(spent, None);
    }

    #[tokio::test]
    async fn test_cached_spent_misses_on_currency_or_absence() {
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .with(eq("groceries"))
            .returning(|_| Ok(Some(SpendingCacheEntry::fresh(dec!(64), "EUR"))));
        store
            .expect_fetch_spending()
            .with(eq("transport"))
            .returning(|_| Ok(None));

        let service = service(store);
        assert_eq!(service.cached_spent("groceries", "USD", window()).await, None);
        assert_eq!(service.cached_spent("transport", "USD", window()).await, None);
    }

    #[tokio::test]
    async fn test_cached_spent_clamps_negative_to_zero() {
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .returning(|_| Ok(Some(SpendingCacheEntry::fresh(dec!(-12), "USD"))));

        let spent = service(store).cached_spent("groceries", "USD", window()).await;
        assert_eq!(spent, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_invalidate_zeroes_and_clears_timestamp() {
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .returning(|_| Ok(Some(SpendingCacheEntry::fresh(dec!(64), "USD"))));
        store
            .expect_save_spending()
            .withf(|_, entry| entry.amount == Decimal::ZERO && entry.updated_at.is_none())
            .times(1)
            .returning(|_, _| Ok(()));

        service(store).invalidate("groceries").await;
    }

    #[tokio::test]
    async fn test_store_errors_read_as_miss() {
        let mut store = MockSpendingStore::new();
        store
            .expect_fetch_spending()
            .returning(|_| Err(crate::store::StoreError::Backend("disk gone".to_string())));

        let spent = service(store).cached_spent("groceries", "USD", window()).await;
        assert_eq!(spent, None);
    }

    #[tokio::test]
    async fn test_rebuild_writes_budgeted_categories_only() {
        let today = Utc::now().date_naive();
        let transactions = vec![
            expense("groceries", dec!(20), today),
            expense("groceries", dec!(15), today),
            expense("transport", dec!(8), today),
        ];
        let categories = vec![
            Category {
                name: "groceries".to_string(),
                kind: TransactionKind::Expense,
                budget_amount: Some(dec!(300)),
                budget_frequency: Some(BudgetFrequency::Monthly { reset_day: 1 }),
            },
            Category {
                name: "transport".to_string(),
                kind: TransactionKind::Expense,
                budget_amount: None,
                budget_frequency: None,
            },
        ];

        let mut store = MockSpendingStore::new();
        store
            .expect_save_spending()
            .withf(|category, entry| category == "groceries" && entry.amount == dec!(35))
            .times(1)
            .returning(|_, _| Ok(()));

        service(store).rebuild(&transactions, &categories, "USD").await;
    }
}
