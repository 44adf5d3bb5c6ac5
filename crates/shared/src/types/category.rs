//! Category types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TransactionKind;

/// A transaction category, optionally carrying a budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Category name (unique).
    pub name: String,
    /// Kind of transactions this category applies to.
    pub kind: TransactionKind,
    /// Budgeted amount per budget period, in the base currency.
    pub budget_amount: Option<Decimal>,
    /// How often the budget window resets. Meaningful only when
    /// `budget_amount` is set.
    pub budget_frequency: Option<BudgetFrequency>,
}

impl Category {
    /// Returns true if this category participates in budget tracking:
    /// it is an expense category with a budget amount.
    #[must_use]
    pub fn is_budgeted(&self) -> bool {
        self.kind == TransactionKind::Expense && self.budget_amount.is_some()
    }
}

/// Budget window recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetFrequency {
    /// Weekly window starting on Monday.
    Weekly,
    /// Monthly window resetting on the given day of month (1-31, clamped
    /// to the month's length).
    Monthly {
        /// Day of month the window resets on.
        reset_day: u32,
    },
    /// Calendar-year window starting January 1st.
    Yearly,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_is_budgeted() {
        let cat = Category {
            name: "Food".to_string(),
            kind: TransactionKind::Expense,
            budget_amount: Some(dec!(500)),
            budget_frequency: Some(BudgetFrequency::Monthly { reset_day: 1 }),
        };
        assert!(cat.is_budgeted());
    }

    #[test]
    fn test_income_category_is_never_budgeted() {
        let cat = Category {
            name: "Salary".to_string(),
            kind: TransactionKind::Income,
            budget_amount: Some(dec!(500)),
            budget_frequency: None,
        };
        assert!(!cat.is_budgeted());
    }

    #[test]
    fn test_no_amount_means_not_budgeted() {
        let cat = Category {
            name: "Misc".to_string(),
            kind: TransactionKind::Expense,
            budget_amount: None,
            budget_frequency: None,
        };
        assert!(!cat.is_budgeted());
    }
}
