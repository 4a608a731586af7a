use alloy::primitives::Address;
use config::{Config, ConfigError, File, FileFormat};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::db::models::Interval;

/// Which [`EntityStore`](crate::db::EntityStore) backend to run against.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on restart
    #[default]
    Memory,
    Postgres,
}

/// PostgreSQL database connection configuration.
///
/// Used for storing tokens, pools, interval rollups and sync checkpoints.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    16
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub postgres: Option<PostgresSettings>,
}

/// One indexed chain.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ChainSettings {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    /// First block to scan when no checkpoint exists (usually the factory
    /// deployment block)
    #[serde(default)]
    pub start_block: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_milliseconds: u64,
    #[serde(default = "default_block_batch_size")]
    pub block_batch_size: u64,
    /// Pool factory; `Initialize` logs from pools it did not deploy are skipped
    pub factory_address: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_poll_interval() -> u64 {
    2_000
}

fn default_block_batch_size() -> u64 {
    2_000
}

fn default_enabled() -> bool {
    true
}

/// Interval widths maintained for every pool and token.
#[derive(Debug, Deserialize, Clone)]
pub struct AggregationSettings {
    #[serde(default = "default_intervals")]
    pub intervals: Vec<Interval>,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            intervals: default_intervals(),
        }
    }
}

fn default_intervals() -> Vec<Interval> {
    Interval::ALL.to_vec()
}

/// Token/pool metadata lookups over RPC.
#[derive(Debug, Deserialize, Clone)]
pub struct MetadataSettings {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl(),
            rpc_timeout_secs: default_rpc_timeout(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    100_000
}

fn default_cache_ttl() -> u64 {
    3_600
}

fn default_rpc_timeout() -> u64 {
    10
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub chains: Vec<ChainSettings>,
    #[serde(default)]
    pub aggregation: AggregationSettings,
    #[serde(default)]
    pub metadata: MetadataSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        Self::finish(s)
    }

    /// Parses settings from an in-memory YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;

        Self::finish(s)
    }

    fn finish(s: Config) -> Result<Self, ConfigError> {
        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Rejects combinations serde defaults cannot catch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregation.intervals.is_empty() {
            return Err(ConfigError::Message(
                "aggregation.intervals must name at least one interval".to_string(),
            ));
        }

        if self.store.backend == StoreBackend::Postgres && self.store.postgres.is_none() {
            return Err(ConfigError::Message(
                "store.backend is postgres but store.postgres is missing".to_string(),
            ));
        }

        let mut seen = FxHashSet::default();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(ConfigError::Message(format!(
                    "chain {} is configured more than once",
                    chain.chain_id
                )));
            }
            if chain.factory_address.parse::<Address>().is_err() {
                return Err(ConfigError::Message(format!(
                    "chain {}: factory_address {:?} is not an address",
                    chain.chain_id, chain.factory_address
                )));
            }
            if chain.block_batch_size == 0 {
                return Err(ConfigError::Message(format!(
                    "chain {}: block_batch_size must be positive",
                    chain.chain_id
                )));
            }
        }

        Ok(())
    }

    /// Tracked intervals without duplicates, in configured order.
    pub fn intervals(&self) -> Vec<Interval> {
        let mut intervals = Vec::with_capacity(self.aggregation.intervals.len());
        for interval in &self.aggregation.intervals {
            if !intervals.contains(interval) {
                intervals.push(*interval);
            }
        }
        intervals
    }

    pub fn enabled_chains(&self) -> impl Iterator<Item = &ChainSettings> {
        self.chains.iter().filter(|c| c.enabled)
    }
}
