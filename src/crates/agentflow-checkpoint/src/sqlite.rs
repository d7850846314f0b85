//! Embedded single-file backends over SQLite
//!
//! [`SqliteSaver`] and [`SqliteStore`] persist to one database file via sqlx.
//! `open` creates the parent directory and the file on demand; any failure to
//! do so surfaces as a [`StorageError`](crate::error::StorageError) so the
//! caller can decide whether to fall back to an in-memory backend.
//!
//! Both types may share one database file; they use separate tables and
//! separate connection pools.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};

use crate::checkpoint::{
    BackendKind, Checkpoint, CheckpointMetadata, CheckpointTuple, ThreadConfig,
};
use crate::error::{Result, StorageError};
use crate::traits::{namespace_path, Checkpointer, Store, StoreItem};

const MAX_CONNECTIONS: u32 = 5;

async fn open_pool(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
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

/// Checkpoint saver persisting to a SQLite file
pub struct SqliteSaver {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteSaver {
    /// Open (or create) the database file at `path`
    ///
    /// Creates missing parent directories. Fails if the path is not writable
    /// or the file cannot be opened as a database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pool = open_pool(path).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
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

        tracing::debug!(path = %path.display(), "opened sqlite checkpoint saver");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database answers a trivial query
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Checkpointer for SqliteSaver {
    async fn put(
        &self,
        config: &ThreadConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<ThreadConfig> {
        let parent_id: Option<(String,)> = sqlx::query_as(
            "SELECT checkpoint_id FROM checkpoints WHERE thread_id = ? ORDER BY rowid DESC LIMIT 1",
        )
        .bind(&config.thread_id)
        .fetch_optional(&self.pool)
        .await?;

        let checkpoint_id = checkpoint.id.clone();
        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints
                 (thread_id, checkpoint_id, parent_id, created_at, checkpoint, metadata)
             VALUES (?, ?, ?, ?, ?, ?)",
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
                     FROM checkpoints WHERE thread_id = ? AND checkpoint_id = ?",
                )
                .bind(&config.thread_id)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT thread_id, checkpoint_id, parent_id, checkpoint, metadata
                     FROM checkpoints WHERE thread_id = ? ORDER BY rowid DESC LIMIT 1",
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
                     FROM checkpoints WHERE thread_id = ? ORDER BY rowid DESC LIMIT ?",
                )
                .bind(&config.thread_id)
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT thread_id, checkpoint_id, parent_id, checkpoint, metadata
                     FROM checkpoints WHERE thread_id = ? ORDER BY rowid DESC",
                )
                .bind(&config.thread_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(CheckpointRow::into_tuple).collect()
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
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

/// Long-term store persisting to a SQLite file
pub struct SqliteStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pool = open_pool(path).await?;

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

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database answers a trivial query
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn put(&self, namespace: &[&str], key: &str, value: Value) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO store_items (namespace, key, value, updated_at)
             VALUES (?, ?, ?, ?)",
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
            sqlx::query_as("SELECT value FROM store_items WHERE namespace = ? AND key = ?")
                .bind(namespace_path(namespace))
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(text,)| serde_json::from_str(&text).map_err(StorageError::from))
            .transpose()
    }

    async fn delete(&self, namespace: &[&str], key: &str) -> Result<()> {
        sqlx::query("DELETE FROM store_items WHERE namespace = ? AND key = ?")
            .bind(namespace_path(namespace))
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, namespace: &[&str]) -> Result<Vec<StoreItem>> {
        let rows: Vec<StoreRow> = sqlx::query_as(
            "SELECT key, value, updated_at FROM store_items
             WHERE namespace = ? ORDER BY key",
        )
        .bind(namespace_path(namespace))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoreRow::into_item).collect()
    }

    async fn clear(&self, namespace: &[&str]) -> Result<()> {
        sqlx::query("DELETE FROM store_items WHERE namespace = ?")
            .bind(namespace_path(namespace))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
