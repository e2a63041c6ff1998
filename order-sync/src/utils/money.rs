//! Money helpers using rust_decimal for precision
//!
//! Amounts are stored as `f64`; every comparison and derived amount goes
//! through `Decimal` and is rounded back to 2 decimal places.

use rust_decimal::prelude::*;
use shared::order::Amounts;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert f64 to Decimal (NaN/Infinity become zero)
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Amounts differ by strictly more than the 0.01 tolerance
pub fn differs(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() > MONEY_TOLERANCE
}

/// Subtotal implied by a remote total: `total - shipping - tax + discount`
pub fn implied_subtotal(total: f64, shipping: f64, tax: f64, discount: f64) -> f64 {
    to_f64(to_decimal(total) - to_decimal(shipping) - to_decimal(tax) + to_decimal(discount))
}

/// Expected total for a set of amounts
pub fn expected_total(amounts: &Amounts) -> f64 {
    to_f64(
        to_decimal(amounts.subtotal) + to_decimal(amounts.shipping) + to_decimal(amounts.tax)
            - to_decimal(amounts.discount),
    )
}

/// `total ≈ subtotal + shipping + tax - discount` within tolerance
pub fn amounts_consistent(amounts: &Amounts) -> bool {
    !differs(amounts.total, expected_total(amounts))
}
