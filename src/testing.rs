//! Test doubles shared by the unit tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use alloy::primitives::U256;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::{
    db::{
        models::{Interval, ParentKind, Pool, Token},
        Collection, EntityStore, MemoryStore,
    },
    error::{IndexerError, Result, StoreError},
    telemetry::{EventSink, IntervalUpdate},
    utils::entity_id,
    worker::{
        events::{DomainEvent, EventParams},
        metadata::{MetadataProvider, PoolMetadata, TokenMetadata},
    },
};

/// 2^96, the sqrtPriceX96 of price 1.0
pub const Q96: U256 = U256::from_limbs([0, 1 << 32, 0, 0]);

pub const CHAIN_ID: u64 = 1;
pub const POOL: &str = "0x8ad599c3a0ff1de082011efddc58f1908eb6e6d8";
pub const TOKEN0: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const TOKEN1: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
pub const FACTORY: &str = "0x1f98431c8ad98523631ae4a59f267346ea31f984";

pub fn sample_token(address: &str, symbol: &str) -> Token {
    Token::new(
        CHAIN_ID,
        address,
        TokenMetadata {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            decimals: 18,
        },
    )
}

pub fn sample_pool(sqrt_price_x96: U256) -> Pool {
    Pool::from_initialize(
        &initialize_event(POOL, 1_000, sqrt_price_x96),
        sqrt_price_x96,
        0,
        &PoolMetadata {
            token0: TOKEN0.to_string(),
            token1: TOKEN1.to_string(),
            fee_tier: 3000,
            factory: FACTORY.to_string(),
        },
    )
}

pub fn initialize_event(pool: &str, block_timestamp: i64, sqrt_price_x96: U256) -> DomainEvent {
    DomainEvent {
        chain_id: CHAIN_ID,
        source_address: pool.to_string(),
        block_number: 12_376_729,
        block_timestamp,
        params: EventParams::Initialize {
            sqrt_price_x96,
            tick: 0,
        },
    }
}

// ============================================
// Observability
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub kind: ParentKind,
    pub interval: Interval,
    pub bucket_id: String,
    pub created: bool,
    pub tx_count: u64,
}

#[derive(Default)]
pub struct RecordingSink {
    tokens: Mutex<Vec<String>>,
    pools: Mutex<Vec<String>>,
    updates: Mutex<Vec<RecordedUpdate>>,
}

impl RecordingSink {
    pub fn created_tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn created_pools(&self) -> Vec<String> {
        self.pools.lock().unwrap().clone()
    }

    pub fn interval_updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn token_created(&self, token: &Token) {
        self.tokens.lock().unwrap().push(token.id.clone());
    }

    fn pool_created(&self, pool: &Pool, _token0: &Token, _token1: &Token) {
        self.pools.lock().unwrap().push(pool.id.clone());
    }

    fn interval_updated(&self, update: &IntervalUpdate<'_>) {
        self.updates.lock().unwrap().push(RecordedUpdate {
            kind: update.kind,
            interval: update.interval,
            bucket_id: update.bucket_id.to_string(),
            created: update.created,
            tx_count: update.tx_count,
        });
    }
}

// ============================================
// Store
// ============================================

/// Memory store with switchable failures and a log of writes.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_gets: AtomicBool,
    fail_sets: AtomicBool,
    fail_next_set: Mutex<Vec<Collection>>,
    set_calls: AtomicUsize,
    writes: Mutex<Vec<(Collection, String)>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    /// The next write to `collection` fails once.
    pub fn fail_next_set(&self, collection: Collection) {
        self.fail_next_set.lock().unwrap().push(collection);
    }

    /// Attempted writes, failed ones included.
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// Successful writes in order.
    pub fn writes(&self) -> Vec<(Collection, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.inner.count(collection)
    }
}

#[async_trait]
impl EntityStore for FaultyStore {
    async fn get(&self, collection: Collection, id: &str) -> std::result::Result<Option<Value>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected read failure".to_string()));
        }
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: Collection, id: &str, value: Value) -> std::result::Result<(), StoreError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        {
            let mut once = self.fail_next_set.lock().unwrap();
            if let Some(pos) = once.iter().position(|c| *c == collection) {
                once.remove(pos);
                return Err(StoreError::Backend("injected write failure".to_string()));
            }
        }
        self.inner.set(collection, id, value).await?;
        self.writes.lock().unwrap().push((collection, id.to_string()));
        Ok(())
    }
}

// ============================================
// Metadata
// ============================================

/// Serves fixed metadata, counting lookups per entity id.
#[derive(Default)]
pub struct ScriptedMetadata {
    tokens: FxHashMap<String, TokenMetadata>,
    pools: FxHashMap<String, PoolMetadata>,
    calls: Mutex<FxHashMap<String, usize>>,
    failures_remaining: AtomicUsize,
}

impl ScriptedMetadata {
    /// Knows [`POOL`] with its two tokens.
    pub fn uniswap() -> Self {
        Self::default()
            .with_token(TOKEN0, "USDC", 6)
            .with_token(TOKEN1, "WETH", 18)
            .with_pool(POOL, TOKEN0, TOKEN1, 3000)
    }

    pub fn with_token(mut self, address: &str, symbol: &str, decimals: u8) -> Self {
        self.tokens.insert(
            address.to_lowercase(),
            TokenMetadata {
                symbol: symbol.to_string(),
                name: format!("{symbol} Token"),
                decimals,
            },
        );
        self
    }

    /// Registers a pool deployed by [`FACTORY`].
    pub fn with_pool(self, address: &str, token0: &str, token1: &str, fee_tier: u32) -> Self {
        self.with_pool_from_factory(address, token0, token1, fee_tier, FACTORY)
    }

    pub fn with_pool_from_factory(
        mut self,
        address: &str,
        token0: &str,
        token1: &str,
        fee_tier: u32,
        factory: &str,
    ) -> Self {
        self.pools.insert(
            address.to_lowercase(),
            PoolMetadata {
                token0: token0.to_lowercase(),
                token1: token1.to_lowercase(),
                fee_tier,
                factory: factory.to_lowercase(),
            },
        );
        self
    }

    /// The next `n` lookups fail regardless of the address.
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn calls_for(&self, address: &str) -> usize {
        let id = entity_id(CHAIN_ID, address);
        self.calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    fn record(&self, chain_id: u64, address: &str) -> Result<()> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(entity_id(chain_id, address))
            .or_default() += 1;

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(IndexerError::metadata_unavailable(chain_id, address, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataProvider for ScriptedMetadata {
    async fn fetch_token_metadata(&self, address: &str, chain_id: u64) -> Result<TokenMetadata> {
        self.record(chain_id, address)?;
        self.tokens
            .get(&address.to_lowercase())
            .cloned()
            .ok_or_else(|| IndexerError::metadata_unavailable(chain_id, address, "unknown token"))
    }

    async fn fetch_pool_metadata(&self, address: &str, chain_id: u64) -> Result<PoolMetadata> {
        self.record(chain_id, address)?;
        self.pools
            .get(&address.to_lowercase())
            .cloned()
            .ok_or_else(|| IndexerError::metadata_unavailable(chain_id, address, "unknown pool"))
    }
}
