use std::sync::RwLock;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::{
    db::{Collection, EntityStore},
    error::StoreError,
};

/// In-process entity store.
///
/// Used for local runs and tests. State is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<FxHashMap<(Collection, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored in a collection.
    pub fn count(&self, collection: Collection) -> usize {
        self.entries
            .read()
            .map(|entries| entries.keys().filter(|(c, _)| *c == collection).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(entries.get(&(collection, id.to_string())).cloned())
    }

    async fn set(&self, collection: Collection, id: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        entries.insert((collection, id.to_string()), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_your_writes() {
        let store = MemoryStore::new();
        assert!(store.get(Collection::Pools, "1-0xabc").await.unwrap().is_none());

        store
            .set(Collection::Pools, "1-0xabc", json!({"tx_count": 1}))
            .await
            .unwrap();
        store
            .set(Collection::Pools, "1-0xabc", json!({"tx_count": 2}))
            .await
            .unwrap();

        let value = store.get(Collection::Pools, "1-0xabc").await.unwrap();
        assert_eq!(value, Some(json!({"tx_count": 2})));
        assert_eq!(store.count(Collection::Pools), 1);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemoryStore::new();
        store
            .set(Collection::PoolDayData, "1-0xabc-0", json!({"interval": "day"}))
            .await
            .unwrap();

        assert!(store
            .get(Collection::PoolHourData, "1-0xabc-0")
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.count(Collection::PoolDayData), 1);
        assert_eq!(store.count(Collection::PoolHourData), 0);
    }
}
