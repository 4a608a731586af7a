use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::StoreError;

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use models::{Interval, ParentKind};

/// Logical table an entity lives in.
///
/// Ids are only unique within a collection, so every store key is the
/// `(collection, id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tokens,
    Pools,
    PoolDayData,
    PoolHourData,
    TokenDayData,
    TokenHourData,
    Checkpoints,
}

impl Collection {
    /// Collection holding the rollups of one parent kind at one width.
    pub fn for_interval(kind: ParentKind, interval: Interval) -> Self {
        match (kind, interval) {
            (ParentKind::Pool, Interval::Day) => Collection::PoolDayData,
            (ParentKind::Pool, Interval::Hour) => Collection::PoolHourData,
            (ParentKind::Token, Interval::Day) => Collection::TokenDayData,
            (ParentKind::Token, Interval::Hour) => Collection::TokenHourData,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Tokens => "tokens",
            Collection::Pools => "pools",
            Collection::PoolDayData => "pool_day_data",
            Collection::PoolHourData => "pool_hour_data",
            Collection::TokenDayData => "token_day_data",
            Collection::TokenHourData => "token_hour_data",
            Collection::Checkpoints => "checkpoints",
        }
    }
}

/// A persisted record addressed by `(collection, id)`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn collection(&self) -> Collection;

    fn id(&self) -> &str;
}

/// Key-value contract over the persistent entity store.
///
/// Values cross this boundary serialized, so nothing a caller holds aliases
/// the stored state. Implementations must give read-your-writes consistency
/// within a single processing unit.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, collection: Collection, id: &str, value: Value) -> Result<(), StoreError>;
}

/// Typed access on top of [`EntityStore`].
#[async_trait]
pub trait EntityStoreExt: EntityStore {
    async fn load<E: Entity>(&self, collection: Collection, id: &str) -> Result<Option<E>, StoreError>;

    async fn save<E: Entity>(&self, entity: &E) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: EntityStore + ?Sized> EntityStoreExt for S {
    async fn load<E: Entity>(&self, collection: Collection, id: &str) -> Result<Option<E>, StoreError> {
        match self.get(collection, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save<E: Entity>(&self, entity: &E) -> Result<(), StoreError> {
        let value = serde_json::to_value(entity)?;
        self.set(entity.collection(), entity.id(), value).await
    }
}
