//! Durable aggregate records and their incremental maintenance.
//!
//! An aggregate record is a precomputed running total for one
//! `(category, subcategory?, year, month)` bucket. Per category, the
//! all-time total equals the sum of the yearly totals, which equals the sum
//! of the monthly totals. The equality is eventual: it may transiently
//! diverge under concurrent incremental updates and is reconciled by
//! [`AggregationService::rebuild`].

mod error;
mod service;
mod types;

pub use error::AggregateError;
pub use service::AggregationService;
pub use types::{
    AggregateKey, AggregateRecord, CategoryExpense, Granularity, TimeCoordinate, TimeFilter,
};
