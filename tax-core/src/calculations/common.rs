//! Rounding helpers for presenting calculated amounts.
//!
//! The calculators keep exact decimal values; rounding happens only where
//! amounts leave the library, such as CSV output.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary amount to two decimal places, midpoints away from zero.
///
/// The result always carries a scale of two, so whole amounts display as
/// `3012.00`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(2759.268)), dec!(2759.27));
/// assert_eq!(round_half_up(dec!(766.515)), dec!(766.52));
/// assert_eq!(round_half_up(dec!(103.5)), dec!(103.50));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
