//! Client/server backends over PostgreSQL (feature `postgres`)
//!
//! [`PostgresSaver`] and [`PostgresStore`] mirror their SQLite counterparts
//! against a server database. `connect` verifies the server actually answers
//! before returning, with a bounded acquire timeout, so an unreachable server
//! fails fast instead of hanging the storage selector.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::checkpoint::{
    BackendKind, Checkpoint, CheckpointMetadata, CheckpointTuple, ThreadConfig,
};
use crate::error::{Result, StorageError};
use crate::traits::{namespace_path, Checkpointer, Store, StoreItem};

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect_pool(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;
    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct CheckpointRow {
    thread_id: String,
    checkpoint_id: String,
    parent_id: Option<String>,
    checkpoint: String,
    metadata: String,
}

impl CheckpointRow {
    fn into_tuple(self) -> Result<CheckpointTuple> {
        let checkpoint: Checkpoint = serde_json::from_str(&self.checkpoint)?;
        let metadata: CheckpointMetadata = serde_json::from_str(&self.metadata)?;
        Ok(CheckpointTuple {
            config: ThreadConfig::new(&self.thread_id).with_checkpoint_id(&self.checkpoint_id),
            checkpoint,
            metadata,
            parent: self
                .parent_id
                .map(|id| ThreadConfig::new(&self.thread_id).with_checkpoint_id(id)),
        })
    }
}

/// Checkpoint saver persisting to a PostgreSQL server
pub struct PostgresSaver {
    pool: PgPool,
}

impl PostgresSaver {
    /// Connect to the server and bootstrap the checkpoint table
    ///
    /// Fails fast when the server is unreachable or refuses the connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = connect_pool(url).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                seq BIGSERIAL,
                thread_id TEXT NOT NULL,
                checkpoint_id TEXT NOT NULL,
                parent_id TEXT,
                created_at TEXT NOT NULL,
                checkpoint TEXT NOT NULL,
                metadata TEXT NOT NULL,
                PRIMARY KEY (thread_id, checkpoint_id)
            )",
        )
        .execute(&pool)
        .await?;

        tracing::debug!("connected postgres checkpoint saver");
        Ok(Self { pool })
    }

    /// Verify the server answers a trivial query
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Checkpointer for PostgresSaver {
    async fn put(
        &self,
        config: &ThreadConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<ThreadConfig> {
        let parent_id: Option<(String,)> = sqlx::query_as(
            "SELECT checkpoint_id FROM checkpoints WHERE thread_id = $1 ORDER BY seq DESC LIMIT 1",
        )
        .bind(&config.thread_id)
        .fetch_optional(&self.pool)
        .await?;

        let checkpoint_id = checkpoint.id.clone();
        sqlx::query(
            "INSERT INTO checkpoints
                 (thread_id, checkpoint_id, parent_id, created_at, checkpoint, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (thread_id, checkpoint_id) DO UPDATE SET
                 parent_id = EXCLUDED.parent_id,
                 created_at = EXCLUDED.created_at,
                 checkpoint = EXCLUDED.checkpoint,
                 metadata = EXCLUDED.metadata",
        )
        .bind(&config.thread_id)
        .bind(&checkpoint_id)
        .bind(parent_id.map(|(id,)| id))
        .bind(checkpoint.ts.to_rfc3339())
        .bind(serde_json::to_string(&checkpoint)?)
        .bind(serde_json::to_string(&metadata)?)
        .execute(&self.pool)
        .await?;

        Ok(ThreadConfig::new(&config.thread_id).with_checkpoint_id(checkpoint_id))
    }

    async fn get_tuple(&self, config: &ThreadConfig) -> Result<Option<CheckpointTuple>> {
        let row: Option<CheckpointRow> = match &config.checkpoint_id {
            Some(id) => {
                sqlx::query_as(
                    "SELECT thread_id, checkpoint_id, parent_id, checkpoint, metadata
                     FROM checkpoints WHERE thread_id = $1 AND checkpoint_id = $2",
                )
                .bind(&config.thread_id)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT thread_id, checkpoint_id, parent_id, checkpoint, metadata
                     FROM checkpoints WHERE thread_id = $1 ORDER BY seq DESC LIMIT 1",
                )
                .bind(&config.thread_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(CheckpointRow::into_tuple).transpose()
    }

    async fn list(
        &self,
        config: &ThreadConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointTuple>> {
        let rows: Vec<CheckpointRow> = match limit {
            Some(n) => {
                sqlx::query_as(
                    "SELECT thread_id, checkpoint_id, parent_id, checkpoint, metadata
                     FROM checkpoints WHERE thread_id = $1 ORDER BY seq DESC LIMIT $2",
                )
                .bind(&config.thread_id)
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT thread_id, checkpoint_id, parent_id, checkpoint, metadata
                     FROM checkpoints WHERE thread_id = $1 ORDER BY seq DESC",
                )
                .bind(&config.thread_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(CheckpointRow::into_tuple).collect()
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = $1")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    key: String,
    value: String,
    updated_at: String,
}

impl StoreRow {
    fn into_item(self) -> Result<StoreItem> {
        let value: Value = serde_json::from_str(&self.value)?;
        let updated_at = chrono::DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|e| StorageError::Backend(format!("invalid timestamp: {e}")))?
            .with_timezone(&chrono::Utc);
        Ok(StoreItem {
            key: self.key,
            value,
            updated_at,
        })
    }
}

/// Long-term store persisting to a PostgreSQL server
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to the server and bootstrap the store table
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = connect_pool(url).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS store_items (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            )",
        )
        .execute(&pool)
        .await?;

        tracing::debug!("connected postgres store");
        Ok(Self { pool })
    }

    /// Verify the server answers a trivial query
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn put(&self, namespace: &[&str], key: &str, value: Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO store_items (namespace, key, value, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (namespace, key) DO UPDATE SET
                 value = EXCLUDED.value,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(namespace_path(namespace))
        .bind(key)
        .bind(serde_json::to_string(&value)?)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, namespace: &[&str], key: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM store_items WHERE namespace = $1 AND key = $2")
                .bind(namespace_path(namespace))
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(text,)| serde_json::from_str(&text).map_err(StorageError::from))
            .transpose()
    }

    async fn delete(&self, namespace: &[&str], key: &str) -> Result<()> {
        sqlx::query("DELETE FROM store_items WHERE namespace = $1 AND key = $2")
            .bind(namespace_path(namespace))
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, namespace: &[&str]) -> Result<Vec<StoreItem>> {
        let rows: Vec<StoreRow> = sqlx::query_as(
            "SELECT key, value, updated_at FROM store_items
             WHERE namespace = $1 ORDER BY key",
        )
        .bind(namespace_path(namespace))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoreRow::into_item).collect()
    }

    async fn clear(&self, namespace: &[&str]) -> Result<()> {
        sqlx::query("DELETE FROM store_items WHERE namespace = $1")
            .bind(namespace_path(namespace))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No server in the test environment; what matters for selection logic is
    // that an unreachable server errors instead of hanging.
    #[tokio::test]
    async fn test_connect_fails_fast_when_unreachable() {
        let start = std::time::Instant::now();
        let result = PostgresSaver::connect("postgres://user:pw@127.0.0.1:1/agentflow").await;
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(30));

        let result = PostgresStore::connect("postgres://user:pw@127.0.0.1:1/agentflow").await;
        assert!(result.is_err());
    }
}
