//! Budget period windows and the per-category spending cache.

mod period;
mod spending;
mod types;

pub use period::period_start;
pub use spending::BudgetSpendingService;
pub use types::SpendingCacheEntry;
