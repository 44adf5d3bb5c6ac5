//! Ledger transaction types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction kind classification.
///
/// Only `Expense` transactions contribute to category aggregates and budget
/// spending; income and transfers are ignored by the aggregation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money leaving an account.
    Expense,
    /// Money entering an account.
    Income,
    /// Movement between two owned accounts.
    Transfer,
}

/// A single ledger transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: Uuid,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Category name. Empty string means uncategorized.
    pub category: String,
    /// Optional subcategory name.
    pub subcategory: Option<String>,
    /// Amount in the transaction's own currency.
    pub amount: Decimal,
    /// Currency code of `amount`.
    pub currency: String,
    /// Amount converted to the base currency at entry time, if available.
    pub converted_amount: Option<Decimal>,
    /// Transaction date.
    pub date: NaiveDate,
    /// Free-form note.
    pub note: Option<String>,
}

impl Transaction {
    /// Returns true if this transaction contributes to expense aggregates:
    /// it is an expense and carries a non-empty category.
    #[must_use]
    pub fn is_aggregatable_expense(&self) -> bool {
        self.kind == TransactionKind::Expense && !self.category.is_empty()
    }
}
