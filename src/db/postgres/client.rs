use anyhow::Context;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use log::{info, warn};
use std::time::Duration;
use tokio_postgres::NoTls;

use crate::config::PostgresSettings;

/// Connection attempts before giving up at startup
const CONNECT_ATTEMPTS: u32 = 3;

/// Schema applied by [`PostgresStore::migrate`]
const SCHEMA: &str = include_str!("../../../schema/postgres.sql");

/// Splits a SQL script on top-level `;`, leaving `$$ ... $$` bodies intact.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut in_dollar_quote = false;
    let mut start = 0;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '$' if matches!(chars.peek(), Some((_, '$'))) => {
                chars.next();
                in_dollar_quote = !in_dollar_quote;
            },
            ';' if !in_dollar_quote => {
                statements.push(&sql[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }
    statements.push(&sql[start..]);

    statements.retain(|s| !s.trim().is_empty());
    statements
}

fn build_pool(settings: &PostgresSettings) -> anyhow::Result<Pool> {
    let mut pg_config = tokio_postgres::Config::new();
    pg_config
        .host(&settings.host)
        .port(settings.port)
        .user(&settings.user)
        .password(&settings.password)
        .dbname(&settings.database);

    let mgr = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );

    Pool::builder(mgr)
        .max_size(settings.pool_size)
        .build()
        .context("Failed to create PostgreSQL connection pool")
}

/// PostgreSQL-backed entity store with connection pooling.
///
/// Every entity is a JSONB document in `indexer.entities`, keyed by
/// `(collection, id)`. Uses `deadpool-postgres` for connection management.
#[derive(Clone)]
pub struct PostgresStore {
    pub pool: Pool,
}

impl PostgresStore {
    /// Builds the pool and waits until one connection succeeds, backing off
    /// exponentially between attempts.
    pub async fn new(settings: PostgresSettings) -> anyhow::Result<Self> {
        info!(
            "Connecting to PostgreSQL at {}:{}/{}",
            settings.host, settings.port, settings.database
        );

        let pool = build_pool(&settings)?;

        let mut attempt = 1;
        loop {
            match pool.get().await {
                Ok(_conn) => {
                    info!("Successfully connected to PostgreSQL");
                    return Ok(Self { pool });
                },
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                    warn!(
                        "Failed to connect to PostgreSQL (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt, CONNECT_ATTEMPTS, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "Failed to connect to PostgreSQL after {} attempts: {}",
                        CONNECT_ATTEMPTS,
                        e
                    ));
                },
            }
        }
    }

    /// Applies the bundled schema. Every statement is idempotent.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        let client = self.pool.get().await?;

        for stmt in split_sql_statements(SCHEMA) {
            let stmt = stmt.trim();
            client
                .execute(stmt, &[])
                .await
                .with_context(|| format!("Failed to execute migration statement: {}", stmt))?;
        }

        info!("PostgreSQL schema is up to date");
        Ok(())
    }
}
