//! Incremental aggregation and caching core for WalletKit.
//!
//! This crate keeps derived financial summaries (category spending totals,
//! budget progress, multi-period rollups) synchronized with a mutable
//! transaction ledger without recomputing from scratch on every read.
//!
//! # Modules
//!
//! - `aggregate` - Durable aggregate records and their incremental maintenance
//! - `budget` - Budget period calculation and the per-category spending cache
//! - `expense` - In-memory LRU mirror serving category expense queries
//! - `summary` - Short-lived spending summary cache
//! - `currency` - Currency conversion with a cached synchronous path
//! - `coordinator` - Decides which caches are invalidated or rebuilt together
//! - `store` - Narrow async interfaces to the persistent record store
//! - `metrics` - Counters exposing background failure rates to embedders

pub mod aggregate;
pub mod budget;
pub mod coordinator;
pub mod currency;
pub mod expense;
pub mod metrics;
pub mod store;
pub mod summary;
