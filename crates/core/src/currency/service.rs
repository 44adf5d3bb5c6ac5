//! Conversion arithmetic.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Decimal places kept by converted amounts.
const CONVERSION_SCALE: u32 = 4;

/// Currency conversion arithmetic.
///
/// All rate application goes through here so every cache layer rounds the
/// same way: Banker's Rounding (`MidpointNearestEven`) at four decimal
/// places.
pub struct CurrencyService;

impl CurrencyService {
    /// Applies an exchange rate (1 source = `rate` target) to an amount.
    #[must_use]
    pub fn apply_rate(amount: Decimal, rate: Decimal) -> Decimal {
        (amount * rate).round_dp_with_strategy(CONVERSION_SCALE, RoundingStrategy::MidpointNearestEven)
    }

    /// Rounds a value with Banker's Rounding at the given scale.
    #[must_use]
    pub fn round(value: Decimal, decimal_places: u32) -> Decimal {
        value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
    }
}
