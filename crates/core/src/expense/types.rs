//! Expense cache query results.

use std::collections::HashMap;

use crate::aggregate::CategoryExpense;

/// Result of an expense cache query.
///
/// A cache that has not been populated yet cannot answer, and an empty map
/// would be indistinguishable from "no spending in this window". The two
/// outcomes are kept as distinct variants so callers fall back to the store
/// instead of rendering an empty report.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpenseLookup {
    /// The cache has no data yet; compute from the durable store instead.
    NotLoaded,
    /// Per-category expenses for the requested window. May be empty, which
    /// genuinely means no matching spending.
    Loaded(HashMap<String, CategoryExpense>),
}

impl ExpenseLookup {
    /// Returns the loaded expense map, or `None` for a cold cache.
    #[must_use]
    pub fn into_loaded(self) -> Option<HashMap<String, CategoryExpense>> {
        match self {
            Self::NotLoaded => None,
            Self::Loaded(map) => Some(map),
        }
    }
}
