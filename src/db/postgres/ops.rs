use async_trait::async_trait;
use log::error;
use serde_json::Value;
use tokio_postgres::types::Json;

use crate::{
    db::{postgres::PostgresStore, Collection, EntityStore},
    error::StoreError,
};

#[async_trait]
impl EntityStore for PostgresStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT data
            FROM indexer.entities
            WHERE collection = $1 AND id = $2
        "#;

        let row = client
            .query_opt(query, &[&collection.as_str(), &id])
            .await?;

        Ok(row.map(|row| {
            let Json(value): Json<Value> = row.get("data");
            value
        }))
    }

    /// Single-statement upsert, atomic per `(collection, id)`.
    async fn set(&self, collection: Collection, id: &str, value: Value) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO indexer.entities (collection, id, data, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, id) DO UPDATE SET
                data = EXCLUDED.data,
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(query, &[&collection.as_str(), &id, &Json(&value)])
            .await
            .map_err(|e| {
                error!(
                    "Failed to upsert {} {}: {:?}",
                    collection.as_str(),
                    id,
                    e
                );
                e
            })?;

        Ok(())
    }
}
