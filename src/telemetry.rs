//! Structured observability for the aggregation core.
//!
//! The engine and the upsert layer never log directly; they report to an
//! injected [`EventSink`]. [`LogSink`] forwards to the `log` facade.

use log::{debug, info};

use crate::{
    db::models::{Interval, Ohlc, ParentKind, Pool, Token},
    utils::sqrt_price_x96_to_price,
};

/// One applied interval update.
#[derive(Debug, Clone)]
pub struct IntervalUpdate<'a> {
    pub kind: ParentKind,
    pub interval: Interval,
    pub bucket_id: &'a str,
    pub bucket_start: i64,
    /// The update created the bucket
    pub created: bool,
    pub tx_count: u64,
    pub ohlc: Option<&'a Ohlc>,
}

pub trait EventSink: Send + Sync {
    fn token_created(&self, token: &Token);

    fn pool_created(&self, pool: &Pool, token0: &Token, token1: &Token);

    fn interval_updated(&self, update: &IntervalUpdate<'_>);
}

/// Forwards core events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn token_created(&self, token: &Token) {
        info!("Created token: {} ({})", token.symbol, token.id);
    }

    fn pool_created(&self, pool: &Pool, token0: &Token, token1: &Token) {
        let price = sqrt_price_x96_to_price(pool.sqrt_price_x96, token0.decimals, token1.decimals);

        info!(
            "Created pool: {}/{} ({}) with fee tier {} at sqrtPrice {} (tick {}, price {})",
            token0.symbol,
            token1.symbol,
            pool.id,
            pool.fee_tier,
            pool.sqrt_price_x96,
            pool.current_tick,
            price.map(|p| p.to_string()).unwrap_or_else(|| "n/a".to_string())
        );
    }

    fn interval_updated(&self, update: &IntervalUpdate<'_>) {
        let action = if update.created { "Seeded" } else { "Updated" };

        match update.ohlc.filter(|_| update.kind.has_ohlc()) {
            Some(ohlc) => debug!(
                "{} {} {} bucket {} (start {}): tx_count={} open={} high={} low={} close={}",
                action,
                update.kind.as_str(),
                update.interval.as_str(),
                update.bucket_id,
                update.bucket_start,
                update.tx_count,
                ohlc.open,
                ohlc.high,
                ohlc.low,
                ohlc.close
            ),
            None => debug!(
                "{} {} {} bucket {} (start {}): tx_count={}",
                action,
                update.kind.as_str(),
                update.interval.as_str(),
                update.bucket_id,
                update.bucket_start,
                update.tx_count
            ),
        }
    }
}
