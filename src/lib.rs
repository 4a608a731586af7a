pub mod abis;
pub mod aggregation;
pub mod config;
pub mod db;
pub mod error;
pub mod telemetry;
pub mod utils;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregation::IntervalUpdater;
pub use config::Settings;
pub use db::{EntityStore, MemoryStore, PostgresStore};
pub use error::{IndexerError, StoreError};
pub use telemetry::{EventSink, LogSink};
pub use worker::{ChainManager, ChainWorker, EntityUpserter, RpcMetadataProvider};
