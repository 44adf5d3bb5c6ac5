//! Full cache stack wired over the in-memory store: coordinator, expense
//! mirror, summary cache, aggregation writer, and budget spending cache.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use walletkit_core::aggregate::{AggregationService, TimeFilter};
use walletkit_core::budget::BudgetSpendingService;
use walletkit_core::coordinator::{CacheCoordinator, InvalidationScope};
use walletkit_core::currency::FixedRateConverter;
use walletkit_core::expense::{CategoryExpenseCache, ExpenseLookup};
use walletkit_core::summary::{SpendingSummary, SummaryCache, SummaryKey};
use walletkit_shared::config::CacheConfig;
use walletkit_shared::types::{Transaction, TransactionKind};
use walletkit_store::MemoryStore;

struct Stack {
    store: Arc<MemoryStore>,
    aggregation: Arc<AggregationService>,
    expenses: Arc<CategoryExpenseCache>,
    summaries: Arc<SummaryCache>,
    coordinator: CacheCoordinator,
}

async fn stack() -> Stack {
    let store = Arc::new(MemoryStore::new());
    let converter = Arc::new(FixedRateConverter::default());
    let aggregation = Arc::new(AggregationService::new(store.clone(), converter.clone()));
    let expenses = Arc::new(CategoryExpenseCache::new(
        store.clone(),
        &CacheConfig::default(),
    ));
    expenses.load_from_store(Utc::now().date_naive()).await;
    let summaries = Arc::new(SummaryCache::new(&CacheConfig::default()));
    let spending = Arc::new(BudgetSpendingService::new(store.clone(), converter.clone()));

    let coordinator = CacheCoordinator::new(
        summaries.clone(),
        converter,
        expenses.clone(),
        aggregation.clone(),
        spending,
    );
    Stack {
        store,
        aggregation,
        expenses,
        summaries,
        coordinator,
    }
}

fn expense(category: &str, amount: Decimal) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        kind: TransactionKind::Expense,
        category: category.to_string(),
        subcategory: None,
        amount,
        currency: "USD".to_string(),
        converted_amount: None,
        date: Utc::now().date_naive(),
        note: None,
    }
}

fn names(list: &[&str]) -> HashSet<String> {
    list.iter().map(|n| (*n).to_string()).collect()
}

async fn mirror_total(stack: &Stack, category: &str) -> Decimal {
    let lookup = stack
        .expenses
        .get_category_expenses(TimeFilter::ThisMonth, "USD", Some(&names(&[category])))
        .await;
    match lookup {
        ExpenseLookup::Loaded(map) => map.get(category).map_or(Decimal::ZERO, |e| e.total),
        ExpenseLookup::NotLoaded => panic!("mirror should be loaded"),
    }
}

#[tokio::test]
async fn test_mirror_and_store_agree_after_mutations() {
    let s = stack().await;
    let a = expense("Food", dec!(25));
    let b = expense("Food", dec!(17));

    s.coordinator.on_transaction_added(&a, "USD", None);
    s.coordinator.on_transaction_added(&b, "USD", None);

    // The mirror answers before the writer has persisted anything.
    assert_eq!(mirror_total(&s, "Food").await, dec!(42));

    s.aggregation.flush().await;
    let today = Utc::now().date_naive();
    let monthly = s
        .aggregation
        .fetch_monthly(today.year(), today.month(), "USD")
        .await
        .unwrap();
    assert_eq!(monthly["Food"].total, dec!(42));

    s.coordinator.on_transaction_deleted(&b, "USD", None);
    assert_eq!(mirror_total(&s, "Food").await, dec!(25));
    s.aggregation.flush().await;
    let monthly = s
        .aggregation
        .fetch_monthly(today.year(), today.month(), "USD")
        .await
        .unwrap();
    assert_eq!(monthly["Food"].total, dec!(25));
}

#[tokio::test]
async fn test_mutation_drops_summaries() {
    let s = stack().await;
    s.summaries.store(
        SummaryKey {
            coordinate: TimeFilter::AllTime.resolve(Utc::now().date_naive()),
            currency: "USD".to_string(),
        },
        SpendingSummary::from_expenses(std::collections::HashMap::new()),
    );

    s.coordinator
        .on_transaction_added(&expense("Food", dec!(5)), "USD", None);
    s.summaries.run_pending_tasks();

    assert_eq!(s.summaries.entry_count(), 0);
}

#[tokio::test]
async fn test_currency_change_keeps_mirror_but_filters_reads() {
    let s = stack().await;
    s.coordinator
        .on_transaction_added(&expense("Food", dec!(30)), "USD", None);

    // Base currency switch: summaries and rates go, the mirror stays.
    s.coordinator
        .invalidate(InvalidationScope::SummaryAndCurrency);
    assert!(!s.expenses.is_empty());

    // Reads in the new currency see no USD-tagged records.
    let lookup = s
        .expenses
        .get_category_expenses(TimeFilter::ThisMonth, "EUR", Some(&names(&["Food"])))
        .await;
    assert_eq!(lookup, ExpenseLookup::Loaded(std::collections::HashMap::new()));

    // And the old currency still answers, pending a background rebuild.
    assert_eq!(mirror_total(&s, "Food").await, dec!(30));
}

#[tokio::test]
async fn test_rebuild_flow_restores_consistency() {
    let s = stack().await;
    // Simulate drift: a delta the store never saw.
    s.store.set_fail_writes(true);
    let lost = expense("Food", dec!(50));
    s.coordinator.on_transaction_added(&lost, "USD", None);
    s.aggregation.flush().await;
    s.store.set_fail_writes(false);
    assert!(s.aggregation.metrics().snapshot().write_failures > 0);

    // The mirror knows about the transaction, the store does not; a
    // rebuild from the raw history reconciles both.
    let history = vec![lost];
    s.coordinator.rebuild_aggregates(&history, "USD");
    s.aggregation.flush().await;

    assert_eq!(mirror_total(&s, "Food").await, dec!(50));
    let today = Utc::now().date_naive();
    let monthly = s
        .aggregation
        .fetch_monthly(today.year(), today.month(), "USD")
        .await
        .unwrap();
    assert_eq!(monthly["Food"].total, dec!(50));
}
