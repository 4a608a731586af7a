use thiserror::Error;

/// Failures of the persistent entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Generic backend failure (lock poisoning, unexpected row shape, etc.)
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("entity serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("postgres pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}

/// Error taxonomy of the aggregation core.
///
/// None of these are swallowed inside the engine or the upsert layer; they
/// surface to the chain worker, which owns retry and drop policy.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Zero/negative bucket width or an unusable key. Never retried.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// External metadata fetch failed.
    #[error("metadata unavailable for {address} on chain {chain_id}: {reason}")]
    MetadataUnavailable {
        chain_id: u64,
        address: String,
        reason: String,
    },

    /// The pool was not deployed by the chain's configured factory.
    #[error("pool {address} on chain {chain_id} was deployed by {factory}, not the configured factory")]
    ForeignPool {
        chain_id: u64,
        address: String,
        factory: String,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl IndexerError {
    pub fn metadata_unavailable(chain_id: u64, address: &str, reason: impl ToString) -> Self {
        IndexerError::MetadataUnavailable {
            chain_id,
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether re-running the whole event may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            IndexerError::InvalidConfiguration(_) => false,
            IndexerError::MetadataUnavailable { .. } => true,
            IndexerError::ForeignPool { .. } => false,
            IndexerError::Storage(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
