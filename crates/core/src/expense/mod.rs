//! The in-memory category expense cache.

mod cache;
mod types;

pub use cache::CategoryExpenseCache;
pub use types::ExpenseLookup;
