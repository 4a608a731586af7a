use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Collection, Entity};

/// Indexer sync progress checkpoint.
///
/// Written by the chain worker once every event up to `last_indexed_block`
/// has been processed. The event source resumes from the block after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub id: String,
    pub chain_id: u64,
    pub last_indexed_block: u64,
    pub updated_at: DateTime<Utc>,
}

impl SyncCheckpoint {
    pub fn new(chain_id: u64, last_indexed_block: u64) -> Self {
        Self {
            id: Self::key(chain_id),
            chain_id,
            last_indexed_block,
            updated_at: Utc::now(),
        }
    }

    /// Store key of the checkpoint for a chain.
    pub fn key(chain_id: u64) -> String {
        chain_id.to_string()
    }
}

impl Entity for SyncCheckpoint {
    fn collection(&self) -> Collection {
        Collection::Checkpoints
    }

    fn id(&self) -> &str {
        &self.id
    }
}
