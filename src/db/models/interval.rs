use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{
    aggregation::{Bucket, IntervalAggregate, IntervalParent},
    db::{
        models::{Pool, Token},
        Collection, Entity,
    },
};

/// Width of a tracked rollup bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Day,
    Hour,
}

impl Interval {
    pub const ALL: [Interval; 2] = [Interval::Day, Interval::Hour];

    pub fn seconds(&self) -> i64 {
        match self {
            Interval::Day => 86_400,
            Interval::Hour => 3_600,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Hour => "hour",
        }
    }
}

/// Kind of parent entity an interval aggregate rolls up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    Pool,
    Token,
}

impl ParentKind {
    /// Pool buckets track open/high/low/close of the price indicator, token
    /// buckets only carry cumulative fields.
    pub fn has_ohlc(&self) -> bool {
        matches!(self, ParentKind::Pool)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParentKind::Pool => "pool",
            ParentKind::Token => "token",
        }
    }
}

/// Open/high/low/close of the price indicator over a bucket's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: U256,
    pub high: U256,
    pub low: U256,
    pub close: U256,
}

impl Ohlc {
    /// All four values start at the seeding observation.
    pub fn open_at(price: U256) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    /// `open` is never touched after creation.
    pub fn observe(&mut self, price: U256) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
    }
}

// ============================================
// Pool rollups
// ============================================

/// Day or hour rollup of a pool (PoolDayData / PoolHourData).
///
/// Primary Key: `{pool_id}-{bucket_index}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolIntervalData {
    pub id: String,
    pub interval: Interval,
    pub bucket_start: i64,
    pub pool_id: String,

    pub ohlc: Ohlc,

    // Bucket-local counter
    pub tx_count: u64,

    // Mirrored from the pool's lifetime totals at the last update
    pub volume0: U256,
    pub volume1: U256,
    pub fees0: U256,
    pub fees1: U256,
    pub tvl0: U256,
    pub tvl1: U256,
    pub swap_count: u64,
    pub mint_count: u64,
    pub burn_count: u64,
    pub collect_count: u64,

    // Snapshot at the last update
    pub liquidity: U256,
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

impl PoolIntervalData {
    fn mirror(&mut self, pool: &Pool) {
        self.volume0 = pool.volume0;
        self.volume1 = pool.volume1;
        self.fees0 = pool.fees0;
        self.fees1 = pool.fees1;
        self.tvl0 = pool.tvl0;
        self.tvl1 = pool.tvl1;
        self.swap_count = pool.swap_count;
        self.mint_count = pool.mint_count;
        self.burn_count = pool.burn_count;
        self.collect_count = pool.collect_count;
        self.liquidity = pool.liquidity;
        self.sqrt_price_x96 = pool.sqrt_price_x96;
        self.tick = pool.current_tick;
    }
}

impl Entity for PoolIntervalData {
    fn collection(&self) -> Collection {
        Collection::for_interval(ParentKind::Pool, self.interval)
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl IntervalAggregate for PoolIntervalData {
    type Parent = Pool;

    fn seed(bucket: &Bucket, interval: Interval, pool: &Pool) -> Self {
        let mut data = Self {
            id: bucket.id.clone(),
            interval,
            bucket_start: bucket.start,
            pool_id: pool.id.clone(),
            ohlc: Ohlc::open_at(pool.sqrt_price_x96),
            tx_count: 0,
            volume0: U256::ZERO,
            volume1: U256::ZERO,
            fees0: U256::ZERO,
            fees1: U256::ZERO,
            tvl0: U256::ZERO,
            tvl1: U256::ZERO,
            swap_count: 0,
            mint_count: 0,
            burn_count: 0,
            collect_count: 0,
            liquidity: U256::ZERO,
            sqrt_price_x96: U256::ZERO,
            tick: 0,
        };
        data.mirror(pool);
        data
    }

    fn observe(&mut self, pool: &Pool) {
        self.ohlc.observe(pool.sqrt_price_x96);
        self.mirror(pool);
    }

    fn record_tx(&mut self) {
        self.tx_count += 1;
    }

    fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn ohlc(&self) -> Option<&Ohlc> {
        Some(&self.ohlc)
    }
}

impl IntervalParent for Pool {
    type Aggregate = PoolIntervalData;

    const KIND: ParentKind = ParentKind::Pool;
}

// ============================================
// Token rollups
// ============================================

/// Day or hour rollup of a token (TokenDayData / TokenHourData).
///
/// Primary Key: `{token_id}-{bucket_index}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIntervalData {
    pub id: String,
    pub interval: Interval,
    pub bucket_start: i64,
    pub token_id: String,

    // Bucket-local counter
    pub tx_count: u64,

    // Mirrored from the token's lifetime totals at the last update
    pub volume: U256,
    pub tvl: U256,
    pub swap_count: u64,
    pub mint_count: u64,
    pub burn_count: u64,
    pub collect_count: u64,
}

impl TokenIntervalData {
    fn mirror(&mut self, token: &Token) {
        self.volume = token.volume;
        self.tvl = token.tvl;
        self.swap_count = token.swap_count;
        self.mint_count = token.mint_count;
        self.burn_count = token.burn_count;
        self.collect_count = token.collect_count;
    }
}

impl Entity for TokenIntervalData {
    fn collection(&self) -> Collection {
        Collection::for_interval(ParentKind::Token, self.interval)
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl IntervalAggregate for TokenIntervalData {
    type Parent = Token;

    fn seed(bucket: &Bucket, interval: Interval, token: &Token) -> Self {
        let mut data = Self {
            id: bucket.id.clone(),
            interval,
            bucket_start: bucket.start,
            token_id: token.id.clone(),
            tx_count: 0,
            volume: U256::ZERO,
            tvl: U256::ZERO,
            swap_count: 0,
            mint_count: 0,
            burn_count: 0,
            collect_count: 0,
        };
        data.mirror(token);
        data
    }

    fn observe(&mut self, token: &Token) {
        self.mirror(token);
    }

    fn record_tx(&mut self) {
        self.tx_count += 1;
    }

    fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn ohlc(&self) -> Option<&Ohlc> {
        None
    }
}

impl IntervalParent for Token {
    type Aggregate = TokenIntervalData;

    const KIND: ParentKind = ParentKind::Token;
}
