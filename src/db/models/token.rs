use alloy::primitives::U256;
use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

use crate::{
    db::{Collection, Entity},
    utils::entity_id,
    worker::metadata::TokenMetadata,
};

/// ERC-20 token metadata and lifetime counters.
///
/// Primary Key: `{chain_id}-{address}`
/// Query Pattern: "Get token info for address X on chain Y"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    // Primary key
    pub id: String,
    pub chain_id: u64,
    pub address: String,

    // On-chain metadata (immutable after first fetch)
    pub symbol: String,
    pub name: String,
    pub decimals: u8,

    // Lifetime amounts (raw token units)
    pub volume: U256,
    pub tvl: U256,

    // Lifetime counters
    pub tx_count: u64,
    pub pool_count: u64,
    pub swap_count: u64,
    pub mint_count: u64,
    pub burn_count: u64,
    pub collect_count: u64,
    pub position_count: u64,
    pub lp_count: u64,

    /// Ids of the pools counted in `pool_count`
    #[serde(default)]
    pub pool_ids: BTreeSet<String>,
}

impl Token {
    /// Fresh token with every counter at zero.
    pub fn new(chain_id: u64, address: &str, metadata: TokenMetadata) -> Self {
        // Always lowercase addresses for consistent comparisons
        let address = address.to_lowercase();

        Self {
            id: entity_id(chain_id, &address),
            chain_id,
            address,
            symbol: metadata.symbol,
            name: metadata.name,
            decimals: metadata.decimals,
            volume: U256::ZERO,
            tvl: U256::ZERO,
            tx_count: 0,
            pool_count: 0,
            swap_count: 0,
            mint_count: 0,
            burn_count: 0,
            collect_count: 0,
            position_count: 0,
            lp_count: 0,
            pool_ids: BTreeSet::new(),
        }
    }

    /// Counts `pool_id` towards `pool_count` once. Returns `false` if the pool
    /// was already linked.
    pub fn link_pool(&mut self, pool_id: &str) -> bool {
        if !self.pool_ids.insert(pool_id.to_string()) {
            return false;
        }
        self.pool_count += 1;
        true
    }
}

impl Entity for Token {
    fn collection(&self) -> Collection {
        Collection::Tokens
    }

    fn id(&self) -> &str {
        &self.id
    }
}
