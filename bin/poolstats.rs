use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use poolstats::{
    config::StoreBackend, ChainManager, EntityStore, LogSink, MemoryStore, PostgresStore,
    RpcMetadataProvider, Settings,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("Failed to install logger")?;

    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let store = open_store(&settings).await?;

    let metadata = Arc::new(
        RpcMetadataProvider::new(&settings.chains, &settings.metadata)
            .context("Failed to initialize metadata provider")?,
    );

    let cancellation_token = CancellationToken::new();

    let chain_manager = ChainManager::new(
        store,
        metadata,
        Arc::new(LogSink),
        settings.intervals(),
    );

    let chains: Vec<_> = settings.enabled_chains().cloned().collect();
    let chain_manager_token = cancellation_token.child_token();
    let chain_manager_handle = tokio::spawn(async move {
        if let Err(e) = chain_manager.run(chains, chain_manager_token).await {
            error!("Chain manager failed: {:#}", e);
        }
    });

    info!(
        "Indexer running with intervals {:?}. Press Ctrl+C to stop.",
        settings.intervals()
    );

    wait_for_shutdown().await?;

    info!("Finishing all tasks...");
    cancellation_token.cancel();

    info!("Waiting for chain manager to stop...");
    let _ = chain_manager_handle.await;

    info!("Shutdown complete");
    Ok(())
}

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn EntityStore>> {
    match settings.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; state is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        },
        StoreBackend::Postgres => {
            let postgres = settings
                .store
                .postgres
                .clone()
                .context("store.postgres settings are required for the postgres backend")?;

            let store = PostgresStore::new(postgres)
                .await
                .context("Failed to initialize database connection")?;
            store.migrate().await.context("Failed to apply migrations")?;

            Ok(Arc::new(store))
        },
    }
}

async fn wait_for_shutdown() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm_stream =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
    }

    Ok(())
}
