//! Type conversion and formatting utilities.

use alloy::primitives::{hex, U256};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use once_cell::sync::Lazy;

// ============================================
// Identifiers
// ============================================

/// Encode bytes as a lowercase hex string with 0x prefix.
pub fn hex_encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Chain-scoped entity id: `{chain_id}-{address}` with the address lowercased.
///
/// Pools and tokens share this scheme so ids never collide across chains.
pub fn entity_id(chain_id: u64, address: &str) -> String {
    format!("{}-{}", chain_id, address.to_lowercase())
}

// ============================================
// U256 Conversions
// ============================================

/// Lossless U256 to BigDecimal conversion (via little-endian bytes).
pub fn u256_to_big_decimal(value: U256) -> BigDecimal {
    let bytes: [u8; 32] = value.to_le_bytes();
    BigDecimal::from(BigInt::from_bytes_le(Sign::Plus, &bytes))
}

// ============================================
// Internal Helpers
// ============================================

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
pub(crate) fn big_pow10(exp: u32) -> BigDecimal {
    match POW10_CACHE.get(exp as usize) {
        Some(cached) => cached.clone(),
        None => BigDecimal::from(BigInt::from(10u32).pow(exp)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_entity_id_lowercases_address() {
        assert_eq!(
            entity_id(1, "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            "1-0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
        );
        assert_eq!(entity_id(10, "0xabc"), entity_id(10, "0xABC"));
        assert_ne!(entity_id(1, "0xabc"), entity_id(10, "0xabc"));
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0xde, 0xad, 0xbe, 0xef]), "0xdeadbeef");
        assert_eq!(hex_encode(&[]), "0x");
    }

    #[test]
    fn test_u256_to_big_decimal() {
        assert_eq!(u256_to_big_decimal(U256::ZERO), BigDecimal::from(0));
        assert_eq!(
            u256_to_big_decimal(U256::MAX),
            BigDecimal::from_str(
                "115792089237316195423570985008687907853269984665640564039457584007913129639935"
            )
            .unwrap()
        );
    }

    #[test]
    fn test_big_pow10_beyond_cache() {
        assert_eq!(big_pow10(0), BigDecimal::from(1));
        assert_eq!(big_pow10(18), BigDecimal::from(1_000_000_000_000_000_000u64));
        assert_eq!(big_pow10(30), BigDecimal::from_str("1e30").unwrap());
    }
}
