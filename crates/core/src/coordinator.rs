//! Cross-cache invalidation and the transaction mutation hooks.
//!
//! Four caches with different lifetimes hang off the transaction history:
//! the durable aggregate records, their in-memory LRU mirror, the budget
//! spending cache, and the summary TTL cache, plus the currency rate
//! cache. The coordinator is the one place that knows which of them a
//! given event touches, so callers never reason about cache dependencies
//! themselves.
//!
//! The load-bearing asymmetry: a base currency change drops summaries and
//! exchange rates but leaves the aggregate mirror alone, because aggregate
//! records store amounts tagged with their currency and are re-filtered at
//! read time. Only a data-shape change (import, restore, detected drift)
//! forces the aggregates themselves to be rebuilt.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use walletkit_shared::types::Transaction;

use crate::aggregate::AggregationService;
use crate::budget::BudgetSpendingService;
use crate::currency::ConversionCache;
use crate::expense::CategoryExpenseCache;
use crate::summary::SummaryCache;

/// How much cached state an event invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Summaries and exchange rates only. The expense mirror survives;
    /// this is the scope for settings changes such as a new base currency.
    SummaryAndCurrency,
    /// Summaries plus the expense mirror, which returns to cold and
    /// reloads from the durable records on the next query.
    Aggregates,
    /// Everything.
    All,
}

/// Routes mutation and settings events to the caches they affect.
pub struct CacheCoordinator {
    summaries: Arc<SummaryCache>,
    rates: Arc<dyn ConversionCache>,
    expenses: Arc<CategoryExpenseCache>,
    aggregation: Arc<AggregationService>,
    spending: Arc<BudgetSpendingService>,
}

impl CacheCoordinator {
    /// Wires the coordinator to every cache layer.
    #[must_use]
    pub fn new(
        summaries: Arc<SummaryCache>,
        rates: Arc<dyn ConversionCache>,
        expenses: Arc<CategoryExpenseCache>,
        aggregation: Arc<AggregationService>,
        spending: Arc<BudgetSpendingService>,
    ) -> Self {
        Self {
            summaries,
            rates,
            expenses,
            aggregation,
            spending,
        }
    }

    /// Invalidates the caches covered by `scope`.
    pub fn invalidate(&self, scope: InvalidationScope) {
        debug!(?scope, "invalidating caches");
        match scope {
            InvalidationScope::SummaryAndCurrency => {
                self.summaries.invalidate_all();
                self.rates.invalidate_rates();
            }
            InvalidationScope::Aggregates => {
                self.summaries.invalidate_all();
                self.expenses.clear();
            }
            InvalidationScope::All => {
                self.summaries.invalidate_all();
                self.rates.invalidate_rates();
                self.expenses.clear();
            }
        }
    }

    /// Rebuilds the aggregate records and their in-memory mirror from the
    /// full transaction history.
    ///
    /// Summaries and rates are dropped first so no reader can observe a
    /// summary computed against the pre-rebuild records.
    pub fn rebuild_aggregates(&self, transactions: &[Transaction], base_currency: &str) {
        info!(
            transactions = transactions.len(),
            "rebuilding aggregates from history"
        );
        self.invalidate(InvalidationScope::SummaryAndCurrency);
        self.expenses
            .rebuild_from_transactions(transactions, base_currency, &self.aggregation);
    }

    /// Reports a newly added transaction to every affected cache.
    ///
    /// The expense mirror is updated synchronously before the durable
    /// write is queued, so a read issued immediately after this call sees
    /// the new totals. `budget_window_start` is the start of the
    /// transaction category's current budget period, or `None` when the
    /// category carries no budget.
    pub fn on_transaction_added(
        &self,
        tx: &Transaction,
        base_currency: &str,
        budget_window_start: Option<NaiveDate>,
    ) {
        let deltas = self.aggregation.deltas_for_added(tx, base_currency);
        self.expenses.apply_deltas(&deltas);
        self.aggregation.enqueue_deltas(deltas);
        self.summaries.invalidate_all();
        self.update_spending(budget_window_start, base_currency, None, Some(tx.clone()));
    }

    /// Reports a deleted transaction to every affected cache.
    pub fn on_transaction_deleted(
        &self,
        tx: &Transaction,
        base_currency: &str,
        budget_window_start: Option<NaiveDate>,
    ) {
        let deltas = self.aggregation.deltas_for_deleted(tx, base_currency);
        self.expenses.apply_deltas(&deltas);
        self.aggregation.enqueue_deltas(deltas);
        self.summaries.invalidate_all();
        self.update_spending(budget_window_start, base_currency, Some(tx.clone()), None);
    }

    /// Reports an edited transaction as a delete of the old version plus
    /// an add of the new.
    pub fn on_transaction_updated(
        &self,
        old: &Transaction,
        new: &Transaction,
        base_currency: &str,
        budget_window_start: Option<NaiveDate>,
    ) {
        let mut deltas = self.aggregation.deltas_for_deleted(old, base_currency);
        deltas.extend(self.aggregation.deltas_for_added(new, base_currency));
        self.expenses.apply_deltas(&deltas);
        self.aggregation.enqueue_deltas(deltas);
        self.summaries.invalidate_all();
        self.update_spending(
            budget_window_start,
            base_currency,
            Some(old.clone()),
            Some(new.clone()),
        );
    }

    /// Schedules the budget spending cache update off the caller's path.
    fn update_spending(
        &self,
        window_start: Option<NaiveDate>,
        base_currency: &str,
        deleted: Option<Transaction>,
        added: Option<Transaction>,
    ) {
        let Some(window_start) = window_start else {
            return;
        };
        let spending = Arc::clone(&self.spending);
        let base = base_currency.to_string();
        tokio::spawn(async move {
            if let Some(tx) = deleted {
                spending.apply_deleted(&tx, &base, window_start).await;
            }
            if let Some(tx) = added {
                spending.apply_added(&tx, &base, window_start).await;
            }
        });
    }

    /// Reports a category rename or deletion.
    ///
    /// Resident aggregate records for the category are dropped and its
    /// budget spending entry is invalidated; the durable aggregate records
    /// are left for the next full rebuild.
    pub async fn on_category_changed(&self, category: &str) {
        self.expenses
            .invalidate_categories(std::slice::from_ref(&category.to_string()));
        self.spending.invalidate(category).await;
        self.summaries.invalidate_all();
    }
}
