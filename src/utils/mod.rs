//! Utility functions for the poolstats indexer.
//!
//! - [`conversion`] - Entity ids, hex encoding and U256 to BigDecimal conversion
//! - [`price`] - sqrtPriceX96 to human price conversion

mod conversion;
mod price;

// ============================================
// Re-exports
// ============================================

pub use conversion::{entity_id, hex_encode, u256_to_big_decimal};

pub use price::sqrt_price_x96_to_price;
