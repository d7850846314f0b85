//! # agentflow-core
//!
//! A state-graph engine for building agent workflows: nodes are async
//! functions over JSON state, edges decide what runs next, and compiled
//! graphs support persistence, streaming and human-in-the-loop interrupts.
//!
//! ## Building blocks
//!
//! - [`StateGraph`]: builder for nodes and edges, compiled into a
//!   [`CompiledGraph`]
//! - [`CompiledGraph`]: runs the graph via [`invoke`](CompiledGraph::invoke)
//!   or [`stream`](CompiledGraph::stream); attach a
//!   [`Checkpointer`] for multi-turn threads, pause/resume and state history
//! - [`Message`] and [`add_messages`]: chat-message state convention used by
//!   conversational graphs
//! - [`Tool`], [`ToolRegistry`], [`ToolNode`]: named async operations a model
//!   can call, plus the node that executes pending calls
//! - [`RetryPolicy`] and [`with_retry`]: exponential backoff for flaky
//!   operations
//!
//! ## Example
//!
//! ```no_run
//! use agentflow_core::{StateGraph, END};
//! use serde_json::json;
//!
//! # async fn run() -> agentflow_core::Result<()> {
//! let graph = StateGraph::new("greeter")
//!     .add_node("greet", |state| {
//!         Box::pin(async move {
//!             let name = state["name"].as_str().unwrap_or("world").to_string();
//!             Ok(json!({ "greeting": format!("hello, {name}") }))
//!         })
//!     })
//!     .set_entry("greet")
//!     .add_edge("greet", END)
//!     .compile()?;
//!
//! let result = graph.invoke(json!({ "name": "ada" })).await?;
//! assert_eq!(result["greeting"], "hello, ada");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod messages;
pub mod retry;
pub mod stream;
pub mod tool;

pub use builder::StateGraph;
pub use compiled::{CompiledGraph, StateSnapshot, DEFAULT_RECURSION_LIMIT};
pub use error::{GraphError, Result};
pub use graph::{Edge, Graph, Node, NodeExecutor, NodeFuture, NodeId, RouterFn, END, START};
pub use messages::{
    add_messages, messages_from_state, messages_to_state, trim_messages, Message, MessageRole,
    ToolCall,
};
pub use retry::{with_retry, RetryPolicy};
pub use stream::{EventStream, StreamEvent, StreamMode};
pub use tool::{Tool, ToolError, ToolNode, ToolRegistry, ToolSpec};

// Persistence types surface in this crate's API; re-export them so callers
// building simple graphs need only one dependency.
pub use agentflow_checkpoint::{Checkpointer, Store, ThreadConfig};
