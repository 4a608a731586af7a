use std::sync::Arc;

use crate::{
    aggregation::{derive_bucket, Bucket, IntervalAggregate, IntervalParent},
    db::{models::Interval, Collection, EntityStore, EntityStoreExt},
    error::Result,
    telemetry::{EventSink, IntervalUpdate},
};

/// Applies one parent snapshot to one interval bucket.
///
/// Day/hour and pool/token variants all go through [`IntervalUpdater::update`];
/// the width comes from the [`Interval`] and the parent kind from
/// [`IntervalParent::KIND`].
///
/// The read-modify-write is not atomic by itself. Callers must serialize
/// updates per parent, which the chain worker does by processing one event at
/// a time per chain.
#[derive(Clone)]
pub struct IntervalUpdater {
    store: Arc<dyn EntityStore>,
    sink: Arc<dyn EventSink>,
}

impl IntervalUpdater {
    pub fn new(store: Arc<dyn EntityStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// Loads (or seeds) the bucket containing `timestamp`, folds in the
    /// parent's current state, bumps `tx_count` and persists the result with
    /// exactly one store write.
    ///
    /// A failed read aborts before anything is written. The returned value is
    /// an owned copy of what was persisted.
    pub async fn update<P: IntervalParent>(
        &self,
        interval: Interval,
        timestamp: i64,
        parent: &P,
    ) -> Result<P::Aggregate> {
        let (bucket, existing) = self.locate::<P>(interval, timestamp, parent).await?;
        self.apply(interval, &bucket, existing, parent).await
    }

    /// Like [`IntervalUpdater::update`], but leaves an existing bucket
    /// untouched and returns `None` for it.
    ///
    /// Used to finish seeding after a partially applied pool creation.
    pub async fn seed_if_missing<P: IntervalParent>(
        &self,
        interval: Interval,
        timestamp: i64,
        parent: &P,
    ) -> Result<Option<P::Aggregate>> {
        let (bucket, existing) = self.locate::<P>(interval, timestamp, parent).await?;
        if existing.is_some() {
            return Ok(None);
        }

        self.apply(interval, &bucket, None, parent).await.map(Some)
    }

    async fn locate<P: IntervalParent>(
        &self,
        interval: Interval,
        timestamp: i64,
        parent: &P,
    ) -> Result<(Bucket, Option<P::Aggregate>)> {
        let bucket = derive_bucket(timestamp, interval.seconds(), parent.id())?;
        let collection = Collection::for_interval(P::KIND, interval);

        let existing: Option<P::Aggregate> = self.store.load(collection, &bucket.id).await?;
        Ok((bucket, existing))
    }

    async fn apply<P: IntervalParent>(
        &self,
        interval: Interval,
        bucket: &Bucket,
        existing: Option<P::Aggregate>,
        parent: &P,
    ) -> Result<P::Aggregate> {
        let created = existing.is_none();

        let mut aggregate = match existing {
            Some(aggregate) => aggregate,
            None => P::Aggregate::seed(bucket, interval, parent),
        };

        aggregate.observe(parent);
        aggregate.record_tx();

        self.store.save(&aggregate).await?;

        self.sink.interval_updated(&IntervalUpdate {
            kind: P::KIND,
            interval,
            bucket_id: &bucket.id,
            bucket_start: bucket.start,
            created,
            tx_count: aggregate.tx_count(),
            ohlc: aggregate.ohlc(),
        });

        Ok(aggregate)
    }
}
