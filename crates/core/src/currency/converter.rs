//! Currency conversion with a cached synchronous path.
//!
//! Aggregation hot paths must never block on the network, so conversion is
//! split in two: `convert_sync` consults only the in-memory rate cache and
//! may miss, while the async `convert` falls back to a [`RateSource`]
//! (typically network-backed) and warms the cache for later synchronous
//! callers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use rust_decimal::Decimal;

use walletkit_shared::config::CurrencyConfig;

use super::service::CurrencyService;

/// Provider of raw exchange rates (1 `from` = rate `to`).
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Looks up a rate, returning `None` when the pair is unknown.
    async fn rate(&self, from: &str, to: &str) -> Option<Decimal>;
}

/// Two-speed currency conversion.
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Cache-only conversion. Never blocks; `None` means the rate is not
    /// resident and the caller should either fall back to the raw amount
    /// or take the async path.
    fn convert_sync(&self, amount: Decimal, from: &str, to: &str) -> Option<Decimal>;

    /// Conversion with a rate-source fallback.
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Option<Decimal>;
}

/// A cache of conversion rates that the coordinator can drop wholesale.
pub trait ConversionCache: Send + Sync {
    /// Drops every cached rate.
    fn invalidate_rates(&self);
}

/// Moka-backed rate cache in front of an async [`RateSource`].
pub struct CachedRateConverter<S> {
    source: Arc<S>,
    rates: Cache<(String, String), Decimal>,
}

impl<S: RateSource> CachedRateConverter<S> {
    /// Creates a converter with the given tuning.
    #[must_use]
    pub fn new(source: Arc<S>, config: &CurrencyConfig) -> Self {
        let rates = Cache::builder()
            .max_capacity(config.rate_capacity)
            .time_to_live(Duration::from_secs(config.rate_ttl_secs))
            .build();
        Self { source, rates }
    }
}

#[async_trait]
impl<S: RateSource> CurrencyConverter for CachedRateConverter<S> {
    fn convert_sync(&self, amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
        if from == to {
            return Some(amount);
        }
        let rate = self.rates.get(&(from.to_string(), to.to_string()))?;
        Some(CurrencyService::apply_rate(amount, rate))
    }

    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
        if let Some(converted) = self.convert_sync(amount, from, to) {
            return Some(converted);
        }
        let rate = self.source.rate(from, to).await?;
        self.rates.insert((from.to_string(), to.to_string()), rate);
        Some(CurrencyService::apply_rate(amount, rate))
    }
}

impl<S: RateSource> ConversionCache for CachedRateConverter<S> {
    fn invalidate_rates(&self) {
        self.rates.invalidate_all();
    }
}

/// Fixed in-memory rate table.
///
/// Deterministic converter for tests and offline operation; also answers
/// the inverse of every configured pair.
#[derive(Default)]
pub struct FixedRateConverter {
    rates: HashMap<(String, String), Decimal>,
}

impl FixedRateConverter {
    /// Adds a rate (and implicitly its inverse) to the table.
    #[must_use]
    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .insert((from.to_string(), to.to_string()), rate);
        self
    }

    fn lookup(&self, from: &str, to: &str) -> Option<Decimal> {
        if let Some(rate) = self.rates.get(&(from.to_string(), to.to_string())) {
            return Some(*rate);
        }
        self.rates
            .get(&(to.to_string(), from.to_string()))
            .and_then(|rate| {
                if rate.is_zero() {
                    None
                } else {
                    Some(Decimal::ONE / rate)
                }
            })
    }
}

#[async_trait]
impl CurrencyConverter for FixedRateConverter {
    fn convert_sync(&self, amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
        if from == to {
            return Some(amount);
        }
        let rate = self.lookup(from, to)?;
        Some(CurrencyService::apply_rate(amount, rate))
    }

    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
        self.convert_sync(amount, from, to)
    }
}

impl ConversionCache for FixedRateConverter {
    fn invalidate_rates(&self) {
        // Fixed tables have no staleness to drop.
    }
}
