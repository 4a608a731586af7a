//! Time-bucketed rollups of pools and tokens.
//!
//! - [`bucket`] - Maps an event timestamp to a canonical bucket id and start
//! - [`engine`] - Load-or-seed, OHLC/cumulative update and persist of one bucket

mod bucket;
mod engine;

pub use bucket::{derive_bucket, Bucket, BUCKET_SEPARATOR};
pub use engine::IntervalUpdater;

use crate::db::{
    models::{Interval, Ohlc, ParentKind},
    Entity,
};

/// A long-lived entity whose current state seeds and feeds interval rollups.
pub trait IntervalParent: Entity {
    type Aggregate: IntervalAggregate<Parent = Self>;

    const KIND: ParentKind;
}

/// Running aggregate of one parent over one bucket.
pub trait IntervalAggregate: Entity {
    type Parent;

    /// New aggregate seeded entirely from the parent's current snapshot.
    /// `tx_count` starts at zero.
    fn seed(bucket: &Bucket, interval: Interval, parent: &Self::Parent) -> Self;

    /// Folds the parent's current snapshot into the aggregate.
    fn observe(&mut self, parent: &Self::Parent);

    fn record_tx(&mut self);

    fn tx_count(&self) -> u64;

    /// `Some` only for parent kinds that track OHLC.
    fn ohlc(&self) -> Option<&Ohlc>;
}
