//! Price conversion utilities for concentrated liquidity pools.

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;

use super::conversion::{big_pow10, u256_to_big_decimal};

/// 2^96 (Q64.96 fixed point scaling factor)
static Q96: Lazy<BigDecimal> = Lazy::new(|| u256_to_big_decimal(U256::from(1u8) << 96));

/// Convert a sqrtPriceX96 to the human price of token0 in units of token1.
///
/// price = (sqrtPriceX96 / 2^96)^2 * 10^(decimals0 - decimals1)
///
/// Returns `None` for a zero price, more than 24 decimals on either side, or a
/// result that does not fit a finite f64.
pub fn sqrt_price_x96_to_price(
    sqrt_price_x96: U256,
    token0_decimals: u8,
    token1_decimals: u8,
) -> Option<f64> {
    if token0_decimals > 24 || token1_decimals > 24 || sqrt_price_x96.is_zero() {
        return None;
    }

    let normalized = u256_to_big_decimal(sqrt_price_x96) / &*Q96;
    let raw_price = &normalized * &normalized;

    let decimal_diff = token0_decimals as i32 - token1_decimals as i32;
    let adjusted = if decimal_diff >= 0 {
        raw_price * big_pow10(decimal_diff as u32)
    } else {
        raw_price / big_pow10(decimal_diff.unsigned_abs())
    };

    adjusted.to_f64().filter(|p| p.is_finite())
}
