mod config;

pub use self::config::{
    AggregationSettings, ChainSettings, MetadataSettings, PostgresSettings, Settings,
    StoreBackend, StoreSettings,
};
