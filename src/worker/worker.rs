use log::{debug, error, info, warn};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    db::{models::SyncCheckpoint, EntityStore, EntityStoreExt},
    error::{IndexerError, Result},
    worker::{
        events::{DomainEvent, EventParams, WorkerMessage},
        upsert::EntityUpserter,
    },
};

/// Interval for logging progress updates (10 seconds)
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Retries after the first failed attempt of an event
const MAX_RETRIES: u32 = 3;

/// Base delay of the exponential backoff between retries
const RETRY_DELAY_MS: u64 = 100;

/// Single writer for one chain.
///
/// Consumes the chain's event source channel in order and applies each event
/// to completion before taking the next one, so no two updates to the same
/// parent ever overlap. Transient failures are retried with exponential
/// backoff; an event that keeps failing is logged and dropped.
pub struct ChainWorker {
    chain_id: u64,
    store: Arc<dyn EntityStore>,
    upserter: EntityUpserter,
    receiver: mpsc::Receiver<WorkerMessage>,
    retry_delay: Duration,
    processed: u64,
    skipped: u64,
    dropped: u64,
}

impl ChainWorker {
    pub fn new(
        chain_id: u64,
        store: Arc<dyn EntityStore>,
        upserter: EntityUpserter,
        receiver: mpsc::Receiver<WorkerMessage>,
    ) -> Self {
        Self {
            chain_id,
            store,
            upserter,
            receiver,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            processed: 0,
            skipped: 0,
            dropped: 0,
        }
    }

    /// Overrides the backoff base delay.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Runs until cancelled or until the event source hangs up.
    pub async fn run(mut self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        let mut last_progress_log = Instant::now();
        let mut last_block = 0;

        loop {
            let message = tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Worker for chain {} received cancellation signal", self.chain_id);
                    break;
                }
                message = self.receiver.recv() => message,
            };

            let Some(message) = message else {
                info!("Event source for chain {} closed", self.chain_id);
                break;
            };

            match message {
                WorkerMessage::Event(event) => self.handle_event(&event).await,
                WorkerMessage::Checkpoint(block) => {
                    self.save_checkpoint(block).await;
                    last_block = block;
                },
            }

            if last_progress_log.elapsed() >= PROGRESS_LOG_INTERVAL {
                info!(
                    "Chain {} processed to block {} ({} events, {} skipped, {} dropped)",
                    self.chain_id, last_block, self.processed, self.skipped, self.dropped
                );
                last_progress_log = Instant::now();
            }
        }

        info!(
            "Worker for chain {} stopped ({} events, {} skipped, {} dropped)",
            self.chain_id, self.processed, self.skipped, self.dropped
        );
        Ok(())
    }

    async fn handle_event(&mut self, event: &DomainEvent) {
        match self.process_with_retry(event).await {
            Ok(()) => self.processed += 1,
            // Anyone can emit an Initialize-shaped log
            Err(e @ IndexerError::ForeignPool { .. }) => {
                self.skipped += 1;
                debug!(
                    "Chain {}: skipping event at block {}: {}",
                    self.chain_id, event.block_number, e
                );
            },
            Err(e) => {
                self.dropped += 1;
                error!(
                    "Chain {}: dropping event from {} at block {}: {}",
                    self.chain_id, event.source_address, event.block_number, e
                );
            },
        }
    }

    async fn process_with_retry(&self, event: &DomainEvent) -> Result<()> {
        let mut attempt = 0;

        loop {
            match self.process(event).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = self.retry_delay * 2u32.pow(attempt);
                    attempt += 1;
                    warn!(
                        "Chain {}: attempt {}/{} for {} failed: {}. Retrying in {:?}",
                        self.chain_id, attempt, MAX_RETRIES, event.source_address, e, delay
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn process(&self, event: &DomainEvent) -> Result<()> {
        if event.chain_id != self.chain_id {
            return Err(IndexerError::InvalidConfiguration(format!(
                "event for chain {} routed to worker of chain {}",
                event.chain_id, self.chain_id
            )));
        }

        match event.params {
            EventParams::Initialize { .. } => {
                self.upserter.on_pool_initialized(event).await?;
            },
        }

        Ok(())
    }

    /// A failed checkpoint write is not fatal; the source re-delivers from
    /// the previous checkpoint on restart and re-delivered events are no-ops.
    async fn save_checkpoint(&self, block: u64) {
        let checkpoint = SyncCheckpoint::new(self.chain_id, block);

        if let Err(e) = self.store.save(&checkpoint).await {
            warn!(
                "Failed to update checkpoint for chain {} at block {}: {}",
                self.chain_id, block, e
            );
        }
    }
}
