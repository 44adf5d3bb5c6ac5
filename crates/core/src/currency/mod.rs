//! Multi-currency conversion.

mod converter;
mod service;

pub use converter::{
    CachedRateConverter, ConversionCache, CurrencyConverter, FixedRateConverter, RateSource,
};
pub use service::CurrencyService;

use rust_decimal::Decimal;
use walletkit_shared::types::Transaction;

/// Resolves a transaction's amount in the base currency.
///
/// Preference order: the precomputed conversion when present and positive,
/// then the converter's cached synchronous path, then the raw amount.
#[must_use]
pub fn resolve_base_amount(
    tx: &Transaction,
    base_currency: &str,
    converter: &dyn CurrencyConverter,
) -> Decimal {
    if let Some(converted) = tx.converted_amount {
        if converted > Decimal::ZERO {
            return converted;
        }
    }
    if tx.currency == base_currency {
        return tx.amount;
    }
    converter
        .convert_sync(tx.amount, &tx.currency, base_currency)
        .unwrap_or(tx.amount)
}
