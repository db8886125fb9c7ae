//! Common utility functions for net income calculations.
//!
//! This module provides the currency rounding shared by every engine
//! operation.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept for currency amounts.
pub const CURRENCY_DP: u32 = 2;

/// Rounds a decimal value to currency precision (two decimal places).
///
/// Values sitting exactly on a half-cent midpoint are rounded toward zero,
/// so `44220.575` becomes `44220.57`. Every other value rounds to the nearest
/// cent.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_currency;
///
/// assert_eq!(round_currency(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_currency(dec!(123.455)), dec!(123.45));
/// assert_eq!(round_currency(dec!(123.4551)), dec!(123.46));
/// assert_eq!(round_currency(dec!(-123.455)), dec!(-123.45)); // Toward zero
/// ```
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointTowardZero)
}
