//! Incremental maintenance of durable aggregate records.
//!
//! A transaction mutation is reported once; the service computes the small
//! set of affected aggregate buckets (monthly, yearly, all-time, doubled
//! when a subcategory is present) and hands them to a background writer
//! task. The caller gets no result channel back: durable-write failures are
//! logged, counted, and otherwise swallowed, and the next full rebuild is
//! the correctness-restoring operation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use walletkit_shared::types::Transaction;

use super::error::AggregateError;
use super::types::{AggregateKey, AggregateRecord, CategoryExpense};
use crate::currency::CurrencyConverter;
use crate::metrics::AggregationMetrics;
use crate::store::AggregateStore;

/// Work items consumed by the writer task.
enum WriteCommand {
    /// Fold deltas into their durable records.
    Deltas(Vec<AggregateRecord>),
    /// Delete everything and persist a freshly built aggregate set.
    Rebuild(Vec<AggregateRecord>),
    /// Acknowledge once every previously queued command has been processed.
    Flush(oneshot::Sender<()>),
}

/// Maintains aggregate records incrementally at three granularities.
pub struct AggregationService {
    store: Arc<dyn AggregateStore>,
    converter: Arc<dyn CurrencyConverter>,
    writer: mpsc::UnboundedSender<WriteCommand>,
    metrics: Arc<AggregationMetrics>,
}

impl AggregationService {
    /// Creates the service and spawns its writer task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(store: Arc<dyn AggregateStore>, converter: Arc<dyn CurrencyConverter>) -> Self {
        let metrics = Arc::new(AggregationMetrics::default());
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&store), rx, Arc::clone(&metrics)));
        Self {
            store,
            converter,
            writer: tx,
            metrics,
        }
    }

    /// Background writer counters.
    #[must_use]
    pub fn metrics(&self) -> &Arc<AggregationMetrics> {
        &self.metrics
    }

    fn resolve_base_amount(&self, tx: &Transaction, base_currency: &str) -> Decimal {
        crate::currency::resolve_base_amount(tx, base_currency, self.converter.as_ref())
    }

    fn deltas(&self, tx: &Transaction, base_currency: &str, sign: Decimal) -> Vec<AggregateRecord> {
        if !tx.is_aggregatable_expense() {
            return Vec::new();
        }

        let amount = self.resolve_base_amount(tx, base_currency) * sign;
        let count = match amount.cmp(&Decimal::ZERO) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        };

        let year = tx.date.year();
        let month = tx.date.month();

        let mut levels: Vec<Option<&str>> = vec![None];
        if let Some(sub) = tx.subcategory.as_deref() {
            levels.push(Some(sub));
        }

        let mut deltas = Vec::with_capacity(levels.len() * 3);
        for sub in levels {
            deltas.push(AggregateRecord::new(
                AggregateKey::monthly(&tx.category, sub, year, month),
                amount,
                count,
                base_currency,
            ));
            deltas.push(AggregateRecord::new(
                AggregateKey::yearly(&tx.category, sub, year),
                amount,
                count,
                base_currency,
            ));
            deltas.push(AggregateRecord::new(
                AggregateKey::all_time(&tx.category, sub),
                amount,
                count,
                base_currency,
            ));
        }
        deltas
    }

    /// Deltas that adding `tx` applies to the aggregate set.
    ///
    /// Empty for non-expense or uncategorized transactions.
    #[must_use]
    pub fn deltas_for_added(&self, tx: &Transaction, base_currency: &str) -> Vec<AggregateRecord> {
        self.deltas(tx, base_currency, Decimal::ONE)
    }

    /// Deltas that removing `tx` applies to the aggregate set.
    #[must_use]
    pub fn deltas_for_deleted(&self, tx: &Transaction, base_currency: &str) -> Vec<AggregateRecord> {
        self.deltas(tx, base_currency, Decimal::NEGATIVE_ONE)
    }

    /// Reports an added transaction. Returns immediately; the durable
    /// update happens on the writer task.
    pub fn apply_added(&self, tx: &Transaction, base_currency: &str) {
        self.enqueue_deltas(self.deltas_for_added(tx, base_currency));
    }

    /// Reports a deleted transaction.
    pub fn apply_deleted(&self, tx: &Transaction, base_currency: &str) {
        self.enqueue_deltas(self.deltas_for_deleted(tx, base_currency));
    }

    /// Reports an edited transaction as a delete of the old version
    /// followed by an add of the new one.
    ///
    /// A category or date change therefore touches two aggregate-key sets,
    /// and a transient zero-crossing between the two halves is acceptable.
    pub fn apply_updated(&self, old: &Transaction, new: &Transaction, base_currency: &str) {
        self.apply_deleted(old, base_currency);
        self.apply_added(new, base_currency);
    }

    /// Queues precomputed deltas for the writer task. Used by callers that
    /// also mirror the same deltas into an in-memory cache.
    pub fn enqueue_deltas(&self, deltas: Vec<AggregateRecord>) {
        if deltas.is_empty() {
            return;
        }
        if self.writer.send(WriteCommand::Deltas(deltas)).is_err() {
            warn!("aggregate writer task is gone; dropping deltas");
        }
    }

    /// Accumulates the full aggregate set for a transaction list in one
    /// pass. Entries netting to zero or below are dropped, not persisted as
    /// zero rows.
    #[must_use]
    pub fn build_aggregates(
        &self,
        transactions: &[Transaction],
        base_currency: &str,
    ) -> Vec<AggregateRecord> {
        let mut buckets: HashMap<AggregateKey, AggregateRecord> = HashMap::new();
        for tx in transactions {
            for delta in self.deltas_for_added(tx, base_currency) {
                buckets
                    .entry(delta.key.clone())
                    .and_modify(|record| record.merge_delta(&delta))
                    .or_insert(delta);
            }
        }
        buckets
            .into_values()
            .filter(|record| record.total_amount > Decimal::ZERO)
            .collect()
    }

    /// Rebuilds every aggregate record from the raw ledger.
    ///
    /// The delete-and-repersist runs on the writer task, serialized behind
    /// any still-queued incremental deltas.
    pub fn rebuild(&self, transactions: &[Transaction], base_currency: &str) {
        self.rebuild_with(self.build_aggregates(transactions, base_currency));
    }

    /// Rebuilds from an already accumulated aggregate set.
    pub fn rebuild_with(&self, records: Vec<AggregateRecord>) {
        if self.writer.send(WriteCommand::Rebuild(records)).is_err() {
            warn!("aggregate writer task is gone; dropping rebuild");
        }
    }

    /// Waits until every previously enqueued write has been attempted.
    ///
    /// The fire-and-forget contract stands for UI callers; this exists so
    /// tests and maintenance flows can observe quiescence.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.writer.send(WriteCommand::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Per-category totals for one month, in the requested currency.
    pub async fn fetch_monthly(
        &self,
        year: i32,
        month: u32,
        currency: &str,
    ) -> Result<HashMap<String, CategoryExpense>, AggregateError> {
        let records = self.store.fetch_year(year).await?;
        Ok(collect_expenses(
            records
                .iter()
                .filter(|r| r.key.month == month && r.currency == currency),
        ))
    }

    /// Per-category all-time totals, in the requested currency.
    pub async fn fetch_all_time(
        &self,
        currency: &str,
    ) -> Result<HashMap<String, CategoryExpense>, AggregateError> {
        let records = self.store.fetch_year(0).await?;
        Ok(collect_expenses(
            records
                .iter()
                .filter(|r| r.key.month == 0 && r.currency == currency),
        ))
    }

    /// Per-category totals summed over the monthly buckets whose month
    /// falls inside `[start, end]`.
    pub async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        currency: &str,
    ) -> Result<HashMap<String, CategoryExpense>, AggregateError> {
        let lo = (start.year(), start.month());
        let hi = (end.year(), end.month());
        let records = self.store.fetch_all().await?;
        Ok(collect_expenses(records.iter().filter(|r| {
            r.key.year > 0
                && r.key.month > 0
                && r.currency == currency
                && (r.key.year, r.key.month) >= lo
                && (r.key.year, r.key.month) <= hi
        })))
    }
}

fn collect_expenses<'a>(
    records: impl Iterator<Item = &'a AggregateRecord>,
) -> HashMap<String, CategoryExpense> {
    let mut expenses: HashMap<String, CategoryExpense> = HashMap::new();
    for record in records {
        expenses
            .entry(record.key.category.clone())
            .or_default()
            .absorb(record);
    }
    expenses
}

/// Applies queued commands against the store, one at a time.
///
/// A single consumer means same-key upserts never race; there is still no
/// cross-key transaction, so a crash between the monthly/yearly/all-time
/// upserts of one delta set leaves a partial change until the next rebuild.
async fn run_writer(
    store: Arc<dyn AggregateStore>,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
    metrics: Arc<AggregationMetrics>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Deltas(deltas) => {
                for delta in deltas {
                    match apply_delta(store.as_ref(), delta).await {
                        Ok(()) => metrics.record_delta_applied(),
                        Err(err) => {
                            warn!(error = %err, "aggregate upsert failed; total may be stale");
                            metrics.record_write_failure();
                        }
                    }
                }
            }
            WriteCommand::Rebuild(records) => {
                if let Err(err) = store.delete_all().await {
                    warn!(error = %err, "aggregate delete-all failed; aborting rebuild");
                    metrics.record_write_failure();
                    continue;
                }
                let mut failed = false;
                for record in records {
                    if let Err(err) = store.upsert(record).await {
                        warn!(error = %err, "aggregate rebuild upsert failed");
                        metrics.record_write_failure();
                        failed = true;
                    }
                }
                if !failed {
                    metrics.record_rebuild();
                }
            }
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

async fn apply_delta(
    store: &dyn AggregateStore,
    delta: AggregateRecord,
) -> Result<(), crate::store::StoreError> {
    let record = match store.fetch(&delta.key).await? {
        Some(mut existing) => {
            existing.merge_delta(&delta);
            existing.currency = delta.currency;
            existing
        }
        None => {
            let mut fresh = delta;
            fresh.transaction_count = fresh.transaction_count.max(0);
            fresh
        }
    };
    store.upsert(record).await
}
