use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
    aggregation::IntervalUpdater,
    db::{
        models::{Interval, Pool, Token},
        Collection, EntityStore, EntityStoreExt,
    },
    error::{IndexerError, Result},
    telemetry::EventSink,
    utils::entity_id,
    worker::{
        events::{DomainEvent, EventParams},
        metadata::MetadataProvider,
    },
};

/// Get-or-create of tokens and pools, feeding new pools into the interval
/// rollups.
///
/// Every step can be re-run after a partial failure: tokens count a pool once
/// through [`Token::link_pool`], and an existing pool gets any missing first
/// bucket seeded on redelivery.
#[derive(Clone)]
pub struct EntityUpserter {
    store: Arc<dyn EntityStore>,
    metadata: Arc<dyn MetadataProvider>,
    sink: Arc<dyn EventSink>,
    updater: IntervalUpdater,
    intervals: Vec<Interval>,
    /// Lowercase factory address per chain
    factories: FxHashMap<u64, String>,
}

impl EntityUpserter {
    pub fn new(
        store: Arc<dyn EntityStore>,
        metadata: Arc<dyn MetadataProvider>,
        sink: Arc<dyn EventSink>,
        intervals: Vec<Interval>,
    ) -> Self {
        Self {
            updater: IntervalUpdater::new(store.clone(), sink.clone()),
            store,
            metadata,
            sink,
            intervals,
            factories: FxHashMap::default(),
        }
    }

    /// Only pools deployed by `factory` are created on `chain_id`.
    pub fn with_factory(mut self, chain_id: u64, factory: &str) -> Self {
        self.factories.insert(chain_id, factory.to_lowercase());
        self
    }

    /// Returns the stored token, or fetches its metadata and persists a new
    /// token with zeroed counters. Existing tokens are never refreshed.
    pub async fn get_or_create_token(&self, chain_id: u64, address: &str) -> Result<Token> {
        let id = entity_id(chain_id, address);

        let existing: Option<Token> = self.store.load(Collection::Tokens, &id).await?;
        if let Some(token) = existing {
            return Ok(token);
        }

        let metadata = self.metadata.fetch_token_metadata(address, chain_id).await?;
        let token = Token::new(chain_id, address, metadata);

        self.store.save(&token).await?;
        self.sink.token_created(&token);

        Ok(token)
    }

    /// Returns the stored pool (`false`), or creates it (`true`).
    ///
    /// Creation checks the deploying factory, resolves both tokens, links the
    /// pool into each token's `pool_count` and only then persists the pool, so
    /// a stored pool never references a missing token.
    pub async fn get_or_create_pool(&self, event: &DomainEvent) -> Result<(Pool, bool)> {
        let pool_id = entity_id(event.chain_id, &event.source_address);

        let existing: Option<Pool> = self.store.load(Collection::Pools, &pool_id).await?;
        if let Some(pool) = existing {
            return Ok((pool, false));
        }

        let EventParams::Initialize {
            sqrt_price_x96,
            tick,
        } = &event.params;

        let metadata = self
            .metadata
            .fetch_pool_metadata(&event.source_address, event.chain_id)
            .await?;

        if let Some(factory) = self.factories.get(&event.chain_id) {
            if !metadata.factory.eq_ignore_ascii_case(factory) {
                return Err(IndexerError::ForeignPool {
                    chain_id: event.chain_id,
                    address: event.source_address.to_lowercase(),
                    factory: metadata.factory,
                });
            }
        }

        let mut token0 = self.get_or_create_token(event.chain_id, &metadata.token0).await?;
        let mut token1 = self.get_or_create_token(event.chain_id, &metadata.token1).await?;

        // Already linked when a previous attempt failed after these writes
        if token0.link_pool(&pool_id) {
            self.store.save(&token0).await?;
        }
        if token1.link_pool(&pool_id) {
            self.store.save(&token1).await?;
        }

        let pool = Pool::from_initialize(event, *sqrt_price_x96, *tick, &metadata);
        self.store.save(&pool).await?;
        self.sink.pool_created(&pool, &token0, &token1);

        Ok((pool, true))
    }

    /// Handles a pool `Initialize` event.
    ///
    /// A newly created pool seeds the first bucket of every tracked interval.
    /// For a known pool only the first buckets that are still missing are
    /// seeded, so a fully applied event is a no-op on redelivery.
    pub async fn on_pool_initialized(&self, event: &DomainEvent) -> Result<Pool> {
        let (pool, created) = self.get_or_create_pool(event).await?;

        for interval in &self.intervals {
            if created {
                self.updater
                    .update(*interval, pool.created_at_timestamp, &pool)
                    .await?;
            } else {
                self.updater
                    .seed_if_missing(*interval, pool.created_at_timestamp, &pool)
                    .await?;
            }
        }

        Ok(pool)
    }
}
