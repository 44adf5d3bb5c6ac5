//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Cache tuning.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Currency conversion tuning.
    #[serde(default)]
    pub currency: CurrencyConfig,
}

/// Cache tuning parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of keyed entries held by the category expense cache.
    #[serde(default = "default_expense_capacity")]
    pub expense_capacity: usize,
    /// Length of the rolling access log used by the prefetch heuristic.
    #[serde(default = "default_access_log_len")]
    pub access_log_len: usize,
    /// Number of most recent accesses inspected when deciding to prefetch.
    #[serde(default = "default_prefetch_window")]
    pub prefetch_window: usize,
    /// Maximum number of cached spending summaries.
    #[serde(default = "default_summary_capacity")]
    pub summary_capacity: u64,
    /// Time-to-live for cached spending summaries, in seconds.
    #[serde(default = "default_summary_ttl_secs")]
    pub summary_ttl_secs: u64,
}

fn default_expense_capacity() -> usize {
    1000
}

fn default_access_log_len() -> usize {
    20
}

fn default_prefetch_window() -> usize {
    10
}

fn default_summary_capacity() -> u64 {
    100
}

fn default_summary_ttl_secs() -> u64 {
    300 // 5 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expense_capacity: default_expense_capacity(),
            access_log_len: default_access_log_len(),
            prefetch_window: default_prefetch_window(),
            summary_capacity: default_summary_capacity(),
            summary_ttl_secs: default_summary_ttl_secs(),
        }
    }
}

/// Currency conversion tuning parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyConfig {
    /// Maximum number of cached exchange rates.
    #[serde(default = "default_rate_capacity")]
    pub rate_capacity: u64,
    /// Time-to-live for cached exchange rates, in seconds.
    #[serde(default = "default_rate_ttl_secs")]
    pub rate_ttl_secs: u64,
}

fn default_rate_capacity() -> u64 {
    256
}

fn default_rate_ttl_secs() -> u64 {
    3600 // 1 hour
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            rate_capacity: default_rate_capacity(),
            rate_ttl_secs: default_rate_ttl_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from config files and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("WALLETKIT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
