//! Shared types for the WalletKit aggregation core.
//!
//! This crate contains the domain types exchanged between the aggregation
//! services and their callers, the application-wide error type, and
//! configuration loading. It has no async, cache, or storage dependencies.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
