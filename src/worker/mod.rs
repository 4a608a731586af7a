pub mod chains;
pub mod events;
pub mod metadata;
pub mod source;
pub mod upsert;
pub mod worker;

pub use chains::ChainManager;
pub use events::{DomainEvent, EventParams, WorkerMessage};
pub use metadata::{MetadataProvider, PoolMetadata, RpcMetadataProvider, TokenMetadata};
pub use source::RpcEventSource;
pub use upsert::EntityUpserter;
pub use worker::ChainWorker;
