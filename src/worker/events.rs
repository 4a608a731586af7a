use alloy::primitives::U256;

/// Decoded parameters of a domain event.
///
/// Only pool creation is decoded; swaps, mints, burns and collects are
/// filtered out by the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventParams {
    /// Pool `Initialize(uint160 sqrtPriceX96, int24 tick)`
    Initialize { sqrt_price_x96: U256, tick: i32 },
}

/// An on-chain event in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvent {
    pub chain_id: u64,
    /// Emitting contract (the pool for `Initialize`), lowercase hex
    pub source_address: String,
    pub block_number: u64,
    pub block_timestamp: i64,
    pub params: EventParams,
}

/// Messages from an event source to its chain worker.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Event(DomainEvent),
    /// Every event up to and including this block has been sent
    Checkpoint(u64),
}
