//! # agentflow-checkpoint
//!
//! Persistence layer for agentflow graphs: short-term **checkpoints** (full
//! graph state per thread, enabling resume and time travel) and long-term
//! **store** items (namespaced key/value memory that outlives any single
//! session).
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Graph execution                        │
//! │                                                            │
//! │   Arc<dyn Checkpointer>              Arc<dyn Store>        │
//! │          │                                 │               │
//! └──────────┼─────────────────────────────────┼───────────────┘
//!            ▼                                 ▼
//!   ┌─────────────────┐               ┌─────────────────┐
//!   │  InMemorySaver  │               │  InMemoryStore  │   process-local
//!   ├─────────────────┤               ├─────────────────┤
//!   │   SqliteSaver   │               │   SqliteStore   │   embedded file
//!   ├─────────────────┤               ├─────────────────┤
//!   │  PostgresSaver  │               │  PostgresStore  │   client/server
//!   └─────────────────┘               └─────────────────┘
//! ```
//!
//! Every backend reports its [`BackendKind`], so code that selects backends
//! with fallback can tell callers which implementation they actually got.
//!
//! ## Backends
//!
//! | Backend | Construction | Survives restart | Failure mode |
//! |---|---|---|---|
//! | in-memory | infallible | no | none |
//! | SQLite | `open(path)`, creates dirs + file | yes | unwritable path, bad file |
//! | PostgreSQL (feature `postgres`) | `connect(url)`, bounded timeout | yes | unreachable server |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use agentflow_checkpoint::{
//!     Checkpoint, CheckpointMetadata, Checkpointer, InMemorySaver, ThreadConfig,
//! };
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let saver = InMemorySaver::new();
//! let config = ThreadConfig::new("session-1");
//!
//! saver
//!     .put(
//!         &config,
//!         Checkpoint::new(json!({"messages": ["hello"]})),
//!         CheckpointMetadata::default(),
//!     )
//!     .await?;
//!
//! // No checkpoint_id set: resolves to the latest checkpoint of the thread
//! let latest = saver.get(&config).await?;
//! assert!(latest.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! Long-term memory goes through [`Store`], keyed by a namespace tuple plus
//! an item key:
//!
//! ```rust,no_run
//! use agentflow_checkpoint::{InMemoryStore, Store};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! store
//!     .put(&["user_preferences", "user-42"], "language", json!("rust"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;
pub mod traits;

pub use checkpoint::{
    BackendKind, Checkpoint, CheckpointId, CheckpointMetadata, CheckpointSource,
    CheckpointTuple, ThreadConfig,
};
pub use error::{Result, StorageError};
pub use memory::{InMemorySaver, InMemoryStore};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresSaver, PostgresStore};
pub use sqlite::{SqliteSaver, SqliteStore};
pub use traits::{namespace_path, Checkpointer, Store, StoreItem};
