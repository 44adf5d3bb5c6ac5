//! Domain types shared across the WalletKit crates.

mod category;
mod transaction;

pub use category::{BudgetFrequency, Category};
pub use transaction::{Transaction, TransactionKind};
