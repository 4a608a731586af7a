use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ChainSettings,
    db::{models::Interval, EntityStore},
    telemetry::EventSink,
    worker::{
        metadata::MetadataProvider, source::RpcEventSource, upsert::EntityUpserter, ChainWorker,
    },
};

/// Buffered events between a chain's source and its worker
const CHANNEL_CAPACITY: usize = 1_024;

/// How long a stopping chain may take before it is abandoned
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Represents a running chain indexer
struct RunningChain {
    name: String,
    source_handle: JoinHandle<()>,
    worker_handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Runs one event source and one worker per enabled chain.
///
/// Each chain gets its own channel and worker, so every chain has exactly one
/// writer and chains never share an entity id.
pub struct ChainManager {
    running_chains: FxHashMap<u64, RunningChain>,
    store: Arc<dyn EntityStore>,
    metadata: Arc<dyn MetadataProvider>,
    sink: Arc<dyn EventSink>,
    intervals: Vec<Interval>,
}

impl ChainManager {
    pub fn new(
        store: Arc<dyn EntityStore>,
        metadata: Arc<dyn MetadataProvider>,
        sink: Arc<dyn EventSink>,
        intervals: Vec<Interval>,
    ) -> Self {
        Self {
            running_chains: FxHashMap::default(),
            store,
            metadata,
            sink,
            intervals,
        }
    }

    /// Start a chain indexer
    fn start_chain(&mut self, config: &ChainSettings) -> Result<()> {
        if self.running_chains.contains_key(&config.chain_id) {
            warn!(
                "Chain {} ({}) is already running, skipping",
                config.name, config.chain_id
            );
            return Ok(());
        }

        info!(
            "Starting indexer for chain {} ({})",
            config.name, config.chain_id
        );

        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

        let source = RpcEventSource::new(config.clone(), self.store.clone(), sender).context(
            format!(
                "Failed to initialize event source for chain {} ({})",
                config.name, config.chain_id
            ),
        )?;

        let upserter = EntityUpserter::new(
            self.store.clone(),
            self.metadata.clone(),
            self.sink.clone(),
            self.intervals.clone(),
        )
        .with_factory(config.chain_id, &config.factory_address);
        let worker = ChainWorker::new(config.chain_id, self.store.clone(), upserter, receiver);

        let cancel_token = CancellationToken::new();

        let source_token = cancel_token.clone();
        let source_name = config.name.clone();
        let source_handle = tokio::spawn(async move {
            if let Err(e) = source.run(source_token).await {
                error!("Event source for {} failed: {:#}", source_name, e);
            }
        });

        let worker_token = cancel_token.clone();
        let worker_name = config.name.clone();
        let worker_handle = tokio::spawn(async move {
            if let Err(e) = worker.run(worker_token).await {
                error!("Worker for {} failed: {:#}", worker_name, e);
            }
        });

        self.running_chains.insert(
            config.chain_id,
            RunningChain {
                name: config.name.clone(),
                source_handle,
                worker_handle,
                cancel_token,
            },
        );

        Ok(())
    }

    /// Stop a chain indexer gracefully
    async fn stop_chain(&mut self, chain_id: u64) {
        let Some(running) = self.running_chains.remove(&chain_id) else {
            warn!(
                "Attempted to stop chain {} but it was not running",
                chain_id
            );
            return;
        };

        info!("Stopping indexer for chain {} ({})", running.name, chain_id);

        running.cancel_token.cancel();

        let handles = async {
            let _ = running.source_handle.await;
            let _ = running.worker_handle.await;
        };

        match tokio::time::timeout(STOP_TIMEOUT, handles).await {
            Ok(_) => {
                info!(
                    "Indexer for chain {} ({}) stopped gracefully",
                    running.name, chain_id
                );
            },
            Err(_) => {
                warn!(
                    "Indexer for chain {} ({}) did not stop within timeout, continuing...",
                    running.name, chain_id
                );
            },
        }
    }

    /// Starts every chain in `chains`, then waits for cancellation and stops
    /// them. Callers pass only the chains they want indexed.
    pub async fn run(
        mut self,
        chains: Vec<ChainSettings>,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        for chain in &chains {
            if let Err(e) = self.start_chain(chain) {
                error!("Failed to start chain {}: {:#}", chain.chain_id, e);
            }
        }

        if self.running_chains.is_empty() {
            warn!("ChainManager: No chains running!");
        } else {
            info!(
                "ChainManager: Started {} chain indexer(s)",
                self.running_chains.len()
            );
        }

        cancellation_token.cancelled().await;
        info!("ChainManager: Received cancellation signal");

        let chain_ids: Vec<u64> = self.running_chains.keys().copied().collect();
        for chain_id in chain_ids {
            self.stop_chain(chain_id).await;
        }

        info!("ChainManager: Shutdown complete");
        Ok(())
    }
}
