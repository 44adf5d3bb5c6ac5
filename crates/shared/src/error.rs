//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// Per-domain errors (aggregation, budget, storage) convert into this type
/// at the crate boundary; inside the background update paths errors are
/// logged and counted rather than propagated.
#[derive(Debug, Error)]
pub enum AppError {
    /// Persistent record store failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration loading failure.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
