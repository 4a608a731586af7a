use alloy::{
    primitives::Address,
    providers::{DynProvider, ProviderBuilder},
};
use anyhow::Context;
use async_trait::async_trait;
use moka::future::Cache;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{
    abis::{IUniswapV3Pool, IERC20},
    config::{ChainSettings, MetadataSettings},
    error::{IndexerError, Result},
    utils::hex_encode,
};

/// Tokens reporting more decimals than this are treated as broken contracts.
const MAX_DECIMALS: u8 = 24;

/// Immutable descriptive fields of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// Immutable descriptive fields of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetadata {
    /// Lowercase hex address of token0
    pub token0: String,
    /// Lowercase hex address of token1
    pub token1: String,
    pub fee_tier: u32,
    /// Lowercase hex address of the deploying factory
    pub factory: String,
}

/// Source of static token/pool metadata.
///
/// Implementations must be idempotent per `(address, chain_id)`; any failure
/// is reported as [`IndexerError::MetadataUnavailable`].
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch_token_metadata(&self, address: &str, chain_id: u64) -> Result<TokenMetadata>;

    async fn fetch_pool_metadata(&self, address: &str, chain_id: u64) -> Result<PoolMetadata>;
}

/// Reads metadata straight from the contracts over JSON-RPC.
///
/// Successful lookups are cached per `(chain_id, address)`; failures are not,
/// so the chain worker's retry reaches the node again.
pub struct RpcMetadataProvider {
    providers: FxHashMap<u64, DynProvider>,
    tokens: Cache<(u64, String), TokenMetadata>,
    pools: Cache<(u64, String), PoolMetadata>,
    rpc_timeout: Duration,
}

impl RpcMetadataProvider {
    pub fn new(chains: &[ChainSettings], settings: &MetadataSettings) -> anyhow::Result<Self> {
        let mut providers = FxHashMap::default();

        for chain in chains {
            let url = Url::parse(&chain.rpc_url)
                .with_context(|| format!("Invalid RPC URL for chain {}", chain.chain_id))?;
            let client = ProviderBuilder::new().connect_http(url);
            providers.insert(chain.chain_id, DynProvider::new(client));
        }

        let ttl = Duration::from_secs(settings.cache_ttl_secs);

        Ok(Self {
            providers,
            tokens: Cache::builder()
                .max_capacity(settings.cache_capacity)
                .time_to_live(ttl)
                .build(),
            pools: Cache::builder()
                .max_capacity(settings.cache_capacity)
                .time_to_live(ttl)
                .build(),
            rpc_timeout: Duration::from_secs(settings.rpc_timeout_secs),
        })
    }

    fn provider(&self, chain_id: u64, address: &str) -> Result<&DynProvider> {
        self.providers.get(&chain_id).ok_or_else(|| {
            IndexerError::metadata_unavailable(chain_id, address, "no RPC provider for chain")
        })
    }

    fn parse_address(chain_id: u64, address: &str) -> Result<Address> {
        address
            .parse()
            .map_err(|e| IndexerError::metadata_unavailable(chain_id, address, e))
    }
}

#[async_trait]
impl MetadataProvider for RpcMetadataProvider {
    async fn fetch_token_metadata(&self, address: &str, chain_id: u64) -> Result<TokenMetadata> {
        let key = (chain_id, address.to_lowercase());
        if let Some(cached) = self.tokens.get(&key).await {
            return Ok(cached);
        }

        let provider = self.provider(chain_id, address)?;
        let token = IERC20::new(Self::parse_address(chain_id, address)?, provider);

        // Decimals is required
        let decimals = match tokio::time::timeout(self.rpc_timeout, token.decimals().call()).await
        {
            Ok(Ok(d)) => d,
            Ok(Err(e)) => return Err(IndexerError::metadata_unavailable(chain_id, address, e)),
            Err(_) => {
                return Err(IndexerError::metadata_unavailable(
                    chain_id,
                    address,
                    "decimals() timed out",
                ))
            },
        };

        if decimals > MAX_DECIMALS {
            return Err(IndexerError::metadata_unavailable(
                chain_id,
                address,
                format!("unsupported decimals {decimals}"),
            ));
        }

        // Name and symbol are optional
        let name_call = token.name();
        let symbol_call = token.symbol();
        let (name, symbol) = futures::join!(
            tokio::time::timeout(self.rpc_timeout, name_call.call()),
            tokio::time::timeout(self.rpc_timeout, symbol_call.call()),
        );
        let name = name.ok().and_then(|r| r.ok()).unwrap_or_default();
        let symbol = symbol.ok().and_then(|r| r.ok()).unwrap_or_default();

        let metadata = TokenMetadata {
            symbol,
            name,
            decimals,
        };
        self.tokens.insert(key, metadata.clone()).await;

        Ok(metadata)
    }

    async fn fetch_pool_metadata(&self, address: &str, chain_id: u64) -> Result<PoolMetadata> {
        let key = (chain_id, address.to_lowercase());
        if let Some(cached) = self.pools.get(&key).await {
            return Ok(cached);
        }

        let provider = self.provider(chain_id, address)?;
        let pool = IUniswapV3Pool::new(Self::parse_address(chain_id, address)?, provider);

        let (token0, token1, fee, factory) = tokio::time::timeout(self.rpc_timeout, async {
            futures::try_join!(
                async { pool.token0().call().await },
                async { pool.token1().call().await },
                async { pool.fee().call().await },
                async { pool.factory().call().await },
            )
        })
        .await
        .map_err(|_| IndexerError::metadata_unavailable(chain_id, address, "pool calls timed out"))?
        .map_err(|e| IndexerError::metadata_unavailable(chain_id, address, e))?;

        let metadata = PoolMetadata {
            token0: hex_encode(token0.as_slice()),
            token1: hex_encode(token1.as_slice()),
            fee_tier: fee.to::<u32>(),
            factory: hex_encode(factory.as_slice()),
        };
        self.pools.insert(key, metadata.clone()).await;

        Ok(metadata)
    }
}
