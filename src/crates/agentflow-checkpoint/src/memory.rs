//! In-memory backends
//!
//! [`InMemorySaver`] and [`InMemoryStore`] keep everything in process memory.
//! They are the terminal fallback of the storage selection chain: their
//! constructors cannot fail, so a selector that reaches them always ends up
//! with usable handles. Data does not survive the process.

use async_trait::async_trait;
use parking_lot::RwLock as SyncRwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::checkpoint::{
    BackendKind, Checkpoint, CheckpointMetadata, CheckpointTuple, ThreadConfig,
};
use crate::error::Result;
use crate::traits::{namespace_path, Checkpointer, Store, StoreItem};

#[derive(Debug, Clone)]
struct SavedCheckpoint {
    checkpoint: Checkpoint,
    metadata: CheckpointMetadata,
    parent: Option<ThreadConfig>,
}

/// Checkpoint saver backed by a process-local map
///
/// Cloning is cheap and clones share storage, so a single saver can be
/// attached to several graphs at once.
#[derive(Debug, Clone, Default)]
pub struct InMemorySaver {
    threads: Arc<RwLock<HashMap<String, Vec<SavedCheckpoint>>>>,
}

impl InMemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with at least one checkpoint
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }

    /// Total number of stored checkpoints across all threads
    pub async fn checkpoint_count(&self) -> usize {
        self.threads.read().await.values().map(Vec::len).sum()
    }

    /// Drop all stored checkpoints
    pub async fn clear(&self) {
        self.threads.write().await.clear();
    }
}

#[async_trait]
impl Checkpointer for InMemorySaver {
    async fn put(
        &self,
        config: &ThreadConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<ThreadConfig> {
        let mut threads = self.threads.write().await;
        let entries = threads.entry(config.thread_id.clone()).or_default();

        let parent = entries.last().map(|entry| {
            ThreadConfig::new(&config.thread_id).with_checkpoint_id(&entry.checkpoint.id)
        });
        let stored =
            ThreadConfig::new(&config.thread_id).with_checkpoint_id(&checkpoint.id);

        entries.push(SavedCheckpoint {
            checkpoint,
            metadata,
            parent,
        });
        Ok(stored)
    }

    async fn get_tuple(&self, config: &ThreadConfig) -> Result<Option<CheckpointTuple>> {
        let threads = self.threads.read().await;
        let Some(entries) = threads.get(&config.thread_id) else {
            return Ok(None);
        };

        let entry = match &config.checkpoint_id {
            Some(id) => entries.iter().find(|entry| &entry.checkpoint.id == id),
            None => entries.last(),
        };

        Ok(entry.map(|entry| CheckpointTuple {
            config: ThreadConfig::new(&config.thread_id)
                .with_checkpoint_id(&entry.checkpoint.id),
            checkpoint: entry.checkpoint.clone(),
            metadata: entry.metadata.clone(),
            parent: entry.parent.clone(),
        }))
    }

    async fn list(
        &self,
        config: &ThreadConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointTuple>> {
        let threads = self.threads.read().await;
        let Some(entries) = threads.get(&config.thread_id) else {
            return Ok(Vec::new());
        };

        let tuples = entries
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .map(|entry| CheckpointTuple {
                config: ThreadConfig::new(&config.thread_id)
                    .with_checkpoint_id(&entry.checkpoint.id),
                checkpoint: entry.checkpoint.clone(),
                metadata: entry.metadata.clone(),
                parent: entry.parent.clone(),
            })
            .collect();
        Ok(tuples)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads.write().await.remove(thread_id);
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }
}

/// Long-term store backed by a process-local map
///
/// Items are held per namespace in key order, so [`Store::list`] is
/// deterministic. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    namespaces: Arc<SyncRwLock<HashMap<String, BTreeMap<String, StoreItem>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of items across all namespaces
    pub fn len(&self) -> usize {
        self.namespaces.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put(&self, namespace: &[&str], key: &str, value: Value) -> Result<()> {
        let mut namespaces = self.namespaces.write();
        namespaces
            .entry(namespace_path(namespace))
            .or_default()
            .insert(
                key.to_string(),
                StoreItem {
                    key: key.to_string(),
                    value,
                    updated_at: chrono::Utc::now(),
                },
            );
        Ok(())
    }

    async fn get(&self, namespace: &[&str], key: &str) -> Result<Option<Value>> {
        let namespaces = self.namespaces.read();
        Ok(namespaces
            .get(&namespace_path(namespace))
            .and_then(|items| items.get(key))
            .map(|item| item.value.clone()))
    }

    async fn delete(&self, namespace: &[&str], key: &str) -> Result<()> {
        let mut namespaces = self.namespaces.write();
        if let Some(items) = namespaces.get_mut(&namespace_path(namespace)) {
            items.remove(key);
        }
        Ok(())
    }

    async fn list(&self, namespace: &[&str]) -> Result<Vec<StoreItem>> {
        let namespaces = self.namespaces.read();
        Ok(namespaces
            .get(&namespace_path(namespace))
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, namespace: &[&str]) -> Result<()> {
        self.namespaces.write().remove(&namespace_path(namespace));
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }
}
