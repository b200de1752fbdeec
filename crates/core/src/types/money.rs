//! Money helpers using decimal arithmetic.
//!
//! All amounts in the storefront are plain [`Decimal`] values in the store's
//! single configured currency. These helpers cover the two places exactness
//! matters: converting to the payment gateway's minor units and rounding for
//! display.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes accepted by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    INR,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// ISO 4217 code string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::INR => "INR",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Round an amount to cents (two decimal places, banker's rounding off -
/// half-way cases round away from zero, matching display formatting).
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an amount in major units to the gateway's minor units (cents).
///
/// The amount is rounded to cents first, so `55.99` becomes `5599` and
/// `10.005` becomes `1001`. Returns `None` if the amount does not fit in an
/// `i64` (not reachable for realistic order totals).
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (round_cents(amount) * Decimal::from(100)).to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(Decimal::new(5599, 2)), Decimal::new(5599, 2));
        assert_eq!(round_cents(Decimal::new(10005, 3)), Decimal::new(1001, 2));
        assert_eq!(round_cents(Decimal::new(10004, 3)), Decimal::new(1000, 2));
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(5599, 2)), Some(5599));
        assert_eq!(to_minor_units(Decimal::from(100)), Some(10000));
        assert_eq!(to_minor_units(Decimal::ZERO), Some(0));
    }

    #[test]
    fn test_to_minor_units_rounds_sub_cent() {
        // 10.005 -> 10.01 -> 1001
        assert_eq!(to_minor_units(Decimal::new(10005, 3)), Some(1001));
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(CurrencyCode::USD.code(), "USD");
        assert_eq!(CurrencyCode::INR.to_string(), "INR");
        assert_eq!(CurrencyCode::default(), CurrencyCode::USD);
    }
}
