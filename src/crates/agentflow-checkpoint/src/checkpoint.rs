//! Core checkpoint data structures
//!
//! A [`Checkpoint`] is a snapshot of graph state at a point in a run,
//! identified by a UUID and owned by a thread (a named conversation or
//! session). [`CheckpointMetadata`] records where in the run the snapshot was
//! taken; [`ThreadConfig`] addresses a thread and optionally a specific
//! checkpoint within it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Unique identifier for a checkpoint
pub type CheckpointId = String;

/// Which backend actually holds the data behind a handle
///
/// Selection logic degrades from richer to simpler backends; this enum lets
/// callers observe which one they really got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local, lost on exit
    Memory,
    /// Embedded single-file database
    Sqlite,
    /// Client/server database
    Postgres,
}

impl BackendKind {
    /// Stable lowercase name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of graph state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique id, assigned at creation
    pub id: CheckpointId,

    /// Creation timestamp
    pub ts: DateTime<Utc>,

    /// The captured state values
    pub values: Value,

    /// Node the run will execute next, if the run was paused here
    pub next: Option<String>,
}

impl Checkpoint {
    /// Create a checkpoint capturing `values`, with a fresh UUID
    pub fn new(values: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts: Utc::now(),
            values,
            next: None,
        }
    }

    /// Mark the node that should run next when this checkpoint is resumed
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }
}

/// What caused a checkpoint to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Initial input to a fresh run
    Input,
    /// Regular per-node snapshot during execution
    Loop,
    /// Explicit caller edit via `update_state`
    Update,
    /// Copied from an earlier checkpoint to branch a thread's history
    Fork,
}

/// Metadata attached to every stored checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Origin of this checkpoint
    pub source: CheckpointSource,

    /// Superstep counter within the run (0 for the input snapshot)
    pub step: i64,

    /// Free-form extra fields, flattened into the serialized object
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl CheckpointMetadata {
    pub fn new(source: CheckpointSource, step: i64) -> Self {
        Self {
            source,
            step,
            extra: HashMap::new(),
        }
    }

    /// Attach an extra metadata field
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl Default for CheckpointMetadata {
    fn default() -> Self {
        Self::new(CheckpointSource::Input, 0)
    }
}

/// Addresses a thread, and optionally one checkpoint within it
///
/// With no `checkpoint_id` set, operations act on the thread's latest
/// checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadConfig {
    /// Thread (session/conversation) identifier
    pub thread_id: String,

    /// Specific checkpoint to address; `None` means the latest
    pub checkpoint_id: Option<CheckpointId>,
}

impl ThreadConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            checkpoint_id: None,
        }
    }

    /// Address a specific checkpoint instead of the latest
    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<CheckpointId>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }
}

/// A checkpoint together with its addressing and lineage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointTuple {
    /// Config addressing exactly this checkpoint
    pub config: ThreadConfig,

    /// The checkpoint itself
    pub checkpoint: Checkpoint,

    /// Metadata recorded at write time
    pub metadata: CheckpointMetadata,

    /// Config addressing the parent checkpoint, if any
    pub parent: Option<ThreadConfig>,
}
