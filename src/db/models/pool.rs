use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{
    db::{Collection, Entity},
    utils::entity_id,
    worker::{events::DomainEvent, metadata::PoolMetadata},
};

/// Concentrated liquidity pool state and lifetime counters.
///
/// Primary Key: `{chain_id}-{address}`
/// Query Pattern: "Get pool info for address X on chain Y"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    // Primary key
    pub id: String,
    pub chain_id: u64,
    pub address: String,

    // Creation reference
    pub created_at_timestamp: i64,
    pub created_at_block_number: u64,

    // Token pair (ids of Token entities)
    pub token0_id: String,
    pub token1_id: String,
    /// Fee in hundredths of a bip (3000 = 0.30%)
    pub fee_tier: u32,

    // Current state
    pub liquidity: U256,
    /// Price indicator tracked by the interval OHLC fields
    pub sqrt_price_x96: U256,
    pub current_tick: i32,
    pub observation_index: u64,
    pub fee_growth_global0_x128: U256,
    pub fee_growth_global1_x128: U256,

    // Lifetime amounts (raw token units)
    pub volume0: U256,
    pub volume1: U256,
    pub fees0: U256,
    pub fees1: U256,
    pub collected0: U256,
    pub collected1: U256,
    pub tvl0: U256,
    pub tvl1: U256,

    // Lifetime counters
    pub tx_count: u64,
    pub swap_count: u64,
    pub mint_count: u64,
    pub burn_count: u64,
    pub collect_count: u64,
    pub position_count: u64,
    pub active_position_count: u64,
    pub lp_count: u64,
}

impl Pool {
    /// Builds a new pool from an `Initialize` event.
    ///
    /// Counters start at zero; the price indicator and tick come from the
    /// event parameters.
    pub fn from_initialize(
        event: &DomainEvent,
        sqrt_price_x96: U256,
        tick: i32,
        metadata: &PoolMetadata,
    ) -> Self {
        let address = event.source_address.to_lowercase();

        Self {
            id: entity_id(event.chain_id, &address),
            chain_id: event.chain_id,
            address,
            created_at_timestamp: event.block_timestamp,
            created_at_block_number: event.block_number,
            token0_id: entity_id(event.chain_id, &metadata.token0),
            token1_id: entity_id(event.chain_id, &metadata.token1),
            fee_tier: metadata.fee_tier,
            liquidity: U256::ZERO,
            sqrt_price_x96,
            current_tick: tick,
            observation_index: 0,
            fee_growth_global0_x128: U256::ZERO,
            fee_growth_global1_x128: U256::ZERO,
            volume0: U256::ZERO,
            volume1: U256::ZERO,
            fees0: U256::ZERO,
            fees1: U256::ZERO,
            collected0: U256::ZERO,
            collected1: U256::ZERO,
            tvl0: U256::ZERO,
            tvl1: U256::ZERO,
            tx_count: 0,
            swap_count: 0,
            mint_count: 0,
            burn_count: 0,
            collect_count: 0,
            position_count: 0,
            active_position_count: 0,
            lp_count: 0,
        }
    }
}

impl Entity for Pool {
    fn collection(&self) -> Collection {
        Collection::Pools
    }

    fn id(&self) -> &str {
        &self.id
    }
}
