//! Token and native-currency amounts.
//!
//! ## Units
//! - Tokens and native currency both use 18 decimals: 1 whole unit = 10^18 base units
//! - Prices are 18-decimal fixed point: native base units per whole token
//! - NO floating point anywhere in settlement math
//!
//! Products of two 18-decimal quantities overflow `u128` quickly (1 000 tokens
//! × 100 native units is already ~10^41), so `mul_div` goes through an
//! arbitrary precision intermediate and only narrows the final quotient.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Amount in base units (tokens or native currency).
pub type Amount = u128;

/// Decimal places shared by the token and the native currency.
pub const DECIMALS: u32 = 18;

/// One whole token / native unit in base units.
pub const UNIT: Amount = 10u128.pow(DECIMALS);

/// Basis-point denominator (10 000 bps = 100%).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Compute `a * b / c` with a wide intermediate, rounding down.
///
/// Returns `None` when `c` is zero or the quotient does not fit in `u128`.
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> Option<Amount> {
    if c == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / c);
    }
    let wide = BigUint::from(a) * BigUint::from(b) / BigUint::from(c);
    wide.to_u128()
}

/// Apply a basis-point fraction to an amount, rounding down.
#[inline]
pub fn apply_bps(amount: Amount, bps: u128) -> Option<Amount> {
    mul_div(amount, bps, BPS_DENOMINATOR)
}

/// Convert whole units into base units (saturating).
#[inline]
pub const fn units(whole: u128) -> Amount {
    whole.saturating_mul(UNIT)
}
