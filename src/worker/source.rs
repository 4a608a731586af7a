use alloy::{
    eips::BlockNumberOrTag,
    primitives::U256,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use anyhow::Context;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    abis::V3Initialize,
    config::ChainSettings,
    db::{models::SyncCheckpoint, Collection, EntityStore, EntityStoreExt},
    utils::hex_encode,
    worker::events::{DomainEvent, EventParams, WorkerMessage},
};

/// Interval for logging progress updates (10 seconds)
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Polls a chain's JSON-RPC node for pool `Initialize` logs.
///
/// Block ranges of `block_batch_size` are scanned in order; each range's
/// events are sent to the chain worker followed by a
/// [`WorkerMessage::Checkpoint`] for the range end. At the chain head the
/// source sleeps for `poll_interval_milliseconds`.
pub struct RpcEventSource {
    chain: ChainSettings,
    provider: DynProvider,
    store: Arc<dyn EntityStore>,
    sender: mpsc::Sender<WorkerMessage>,
}

impl RpcEventSource {
    pub fn new(
        chain: ChainSettings,
        store: Arc<dyn EntityStore>,
        sender: mpsc::Sender<WorkerMessage>,
    ) -> anyhow::Result<Self> {
        let url = Url::parse(&chain.rpc_url).context("Invalid RPC URL")?;
        let provider = DynProvider::new(ProviderBuilder::new().connect_http(url));

        Ok(Self {
            chain,
            provider,
            store,
            sender,
        })
    }

    /// First block not covered by the stored checkpoint.
    async fn resume_block(&self) -> anyhow::Result<u64> {
        let checkpoint: Option<SyncCheckpoint> = self
            .store
            .load(Collection::Checkpoints, &SyncCheckpoint::key(self.chain.chain_id))
            .await
            .context("Failed to read sync checkpoint")?;

        Ok(match checkpoint {
            Some(c) => (c.last_indexed_block + 1).max(self.chain.start_block),
            None => self.chain.start_block,
        })
    }

    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        let chain_id = self.chain.chain_id;
        let poll_interval = Duration::from_millis(self.chain.poll_interval_milliseconds);
        let mut next_block = self.resume_block().await?;
        let mut last_progress_log = Instant::now();

        info!("Chain {} source starting at block {}", chain_id, next_block);

        loop {
            if cancellation_token.is_cancelled() {
                break;
            }

            let range = match self.provider.get_block_number().await {
                Ok(head) => next_range(next_block, head, self.chain.block_batch_size),
                Err(e) => {
                    warn!("Chain {}: failed to fetch head block: {}", chain_id, e);
                    None
                },
            };

            let Some((from, to)) = range else {
                if sleep_or_cancel(&cancellation_token, poll_interval).await {
                    break;
                }
                continue;
            };

            let events = match self.fetch_range(from, to).await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Chain {}: failed to fetch blocks {}..={}: {:#}", chain_id, from, to, e);
                    if sleep_or_cancel(&cancellation_token, poll_interval).await {
                        break;
                    }
                    continue;
                },
            };

            if !events.is_empty() {
                debug!(
                    "Chain {}: {} initialize events in blocks {}..={}",
                    chain_id,
                    events.len(),
                    from,
                    to
                );
            }

            for event in events {
                if self.sender.send(WorkerMessage::Event(event)).await.is_err() {
                    warn!("Chain {}: worker channel closed, stopping source", chain_id);
                    return Ok(());
                }
            }
            if self.sender.send(WorkerMessage::Checkpoint(to)).await.is_err() {
                return Ok(());
            }

            next_block = to.saturating_add(1);

            if last_progress_log.elapsed() >= PROGRESS_LOG_INTERVAL {
                info!("Chain {} scanned to block {}", chain_id, to);
                last_progress_log = Instant::now();
            }
        }

        info!("Chain {} source stopped at block {}", chain_id, next_block);
        Ok(())
    }

    /// Decoded initialize events of `from..=to` in log order.
    async fn fetch_range(&self, from: u64, to: u64) -> anyhow::Result<Vec<DomainEvent>> {
        let filter = Filter::new()
            .event_signature(V3Initialize::SIGNATURE_HASH)
            .from_block(from)
            .to_block(to);

        let logs = self.provider.get_logs(&filter).await?;

        let mut timestamps: FxHashMap<u64, u64> = FxHashMap::default();
        let mut events = Vec::with_capacity(logs.len());

        for log in &logs {
            if log.removed {
                continue;
            }
            let Some(block_number) = log.block_number else {
                continue;
            };

            let raw_timestamp = match log.block_timestamp {
                Some(t) => t,
                None => match timestamps.get(&block_number) {
                    Some(t) => *t,
                    None => {
                        let t = self.block_timestamp(block_number).await?;
                        timestamps.insert(block_number, t);
                        t
                    },
                },
            };

            let Some(timestamp) = event_timestamp(raw_timestamp) else {
                warn!(
                    "Chain {}: skipping log at block {} with out-of-range timestamp {}",
                    self.chain.chain_id, block_number, raw_timestamp
                );
                continue;
            };

            match decode_initialize(self.chain.chain_id, log, timestamp) {
                Some(event) => events.push(event),
                None => warn!(
                    "Chain {}: undecodable initialize log at block {}",
                    self.chain.chain_id, block_number
                ),
            }
        }

        Ok(events)
    }

    async fn block_timestamp(&self, block_number: u64) -> anyhow::Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number))
            .await?
            .with_context(|| format!("Block {} not found", block_number))?;

        Ok(block.header.timestamp)
    }
}

/// Sleeps for `duration`; `true` if cancelled first.
async fn sleep_or_cancel(cancellation_token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancellation_token.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Node timestamps are unsigned; anything past `i64::MAX` cannot be bucketed.
pub(crate) fn event_timestamp(raw: u64) -> Option<i64> {
    i64::try_from(raw).ok()
}

/// Next inclusive block range to scan, or `None` when `next` is past `head`.
pub(crate) fn next_range(next: u64, head: u64, batch_size: u64) -> Option<(u64, u64)> {
    if next > head {
        return None;
    }
    let to = next.saturating_add(batch_size.max(1) - 1).min(head);
    Some((next, to))
}

/// Decodes an `Initialize` log into a domain event.
pub(crate) fn decode_initialize(chain_id: u64, log: &Log, block_timestamp: i64) -> Option<DomainEvent> {
    let decoded = log.log_decode::<V3Initialize>().ok()?;
    let event = &decoded.inner.data;

    Some(DomainEvent {
        chain_id,
        source_address: hex_encode(decoded.inner.address.as_slice()),
        block_number: log.block_number?,
        block_timestamp,
        params: EventParams::Initialize {
            sqrt_price_x96: U256::from(event.sqrtPriceX96),
            tick: event.tick.as_i32(),
        },
    })
}
