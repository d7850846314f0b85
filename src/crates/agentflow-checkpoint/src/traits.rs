//! The two persistence traits: [`Checkpointer`] for short-term, per-thread
//! graph checkpoints, and [`Store`] for long-term, namespaced key/value
//! memory.
//!
//! Both traits are object safe and every backend implements both roles
//! through a matching pair of types (`InMemorySaver`/`InMemoryStore`,
//! `SqliteSaver`/`SqliteStore`, ...). Graph execution only ever sees
//! `Arc<dyn Checkpointer>` / `Arc<dyn Store>`, so callers can swap backends
//! without touching graph code.
//!
//! # Short-term vs long-term
//!
//! | Concern | Trait | Keyed by | Typical content |
//! |---|---|---|---|
//! | Session checkpoints | [`Checkpointer`] | thread id (+ checkpoint id) | full graph state per superstep |
//! | Cross-session memory | [`Store`] | namespace segments + item key | preferences, facts, history |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checkpoint::{
    BackendKind, Checkpoint, CheckpointMetadata, CheckpointTuple, ThreadConfig,
};
use crate::error::Result;

/// Persists per-thread graph checkpoints
///
/// Implementations must treat `put` for an existing checkpoint id as a
/// replace, and must resolve a [`ThreadConfig`] without `checkpoint_id` to
/// the thread's most recently written checkpoint.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Store a checkpoint for the thread in `config`
    ///
    /// Returns a config addressing exactly the stored checkpoint.
    async fn put(
        &self,
        config: &ThreadConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<ThreadConfig>;

    /// Fetch a checkpoint with its metadata and parent lineage
    ///
    /// Resolves to the latest checkpoint when `config.checkpoint_id` is
    /// `None`. Returns `Ok(None)` for an unknown thread or checkpoint.
    async fn get_tuple(&self, config: &ThreadConfig) -> Result<Option<CheckpointTuple>>;

    /// Fetch just the checkpoint, without metadata
    async fn get(&self, config: &ThreadConfig) -> Result<Option<Checkpoint>> {
        Ok(self.get_tuple(config).await?.map(|tuple| tuple.checkpoint))
    }

    /// List checkpoints for a thread, newest first
    async fn list(
        &self,
        config: &ThreadConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointTuple>>;

    /// Remove every checkpoint belonging to a thread
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Which backend this handle writes to
    fn backend(&self) -> BackendKind;

    /// Release underlying resources (connection pools, file handles)
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A single entry in a [`Store`] namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreItem {
    /// Item key, unique within its namespace
    pub key: String,

    /// Stored value
    pub value: Value,

    /// Last write time
    pub updated_at: DateTime<Utc>,
}

/// Persists long-term key/value memory, partitioned by namespace
///
/// A namespace is an ordered tuple of string segments, e.g.
/// `["user_preferences", "user-42"]`. Items in different namespaces never
/// collide even when their keys match.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace an item
    async fn put(&self, namespace: &[&str], key: &str, value: Value) -> Result<()>;

    /// Fetch an item's value, `Ok(None)` if absent
    async fn get(&self, namespace: &[&str], key: &str) -> Result<Option<Value>>;

    /// Remove an item; removing an absent item is not an error
    async fn delete(&self, namespace: &[&str], key: &str) -> Result<()>;

    /// List all items in a namespace, ordered by key
    async fn list(&self, namespace: &[&str]) -> Result<Vec<StoreItem>>;

    /// Remove every item in a namespace
    async fn clear(&self, namespace: &[&str]) -> Result<()>;

    /// Which backend this handle writes to
    fn backend(&self) -> BackendKind;

    /// Release underlying resources (connection pools, file handles)
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Canonical flat representation of a namespace tuple
///
/// Backends key rows by this joined form. Segments should not contain `/`.
pub fn namespace_path(namespace: &[&str]) -> String {
    namespace.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_path_joins_segments() {
        assert_eq!(namespace_path(&["user_preferences", "u1"]), "user_preferences/u1");
        assert_eq!(namespace_path(&["memories"]), "memories");
        assert_eq!(namespace_path(&[]), "");
    }
}
