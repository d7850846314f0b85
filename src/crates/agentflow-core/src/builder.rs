//! StateGraph builder
//!
//! [`StateGraph`] is the entry point of the crate: register nodes, wire edges,
//! then [`compile`](StateGraph::compile) into a runnable
//! [`CompiledGraph`](crate::CompiledGraph).
//!
//! ```no_run
//! use agentflow_core::{StateGraph, END};
//! use serde_json::json;
//!
//! # async fn demo() -> agentflow_core::Result<()> {
//! let graph = StateGraph::new("counter")
//!     .add_node("increment", |state| {
//!         Box::pin(async move {
//!             let count = state["count"].as_i64().unwrap_or(0);
//!             Ok(json!({ "count": count + 1 }))
//!         })
//!     })
//!     .set_entry("increment")
//!     .add_edge("increment", END)
//!     .compile()?;
//!
//! let result = graph.invoke(json!({ "count": 0 })).await?;
//! assert_eq!(result["count"], 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::compiled::CompiledGraph;
use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, Node, RouterFn, START};

/// Builder for a state graph
///
/// State is a JSON object. Each node receives the full state and returns a
/// partial update which is shallow-merged back in; with
/// [`with_messages`](StateGraph::with_messages), the `messages` key is merged
/// with the [`add_messages`](crate::add_messages) reducer instead of replaced.
#[derive(Debug, Clone)]
pub struct StateGraph {
    name: String,
    graph: Graph,
    messages_mode: bool,
}

impl StateGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: Graph::new(),
            messages_mode: false,
        }
    }

    /// Enable the `add_messages` reducer for the `messages` state key
    pub fn with_messages(mut self) -> Self {
        self.messages_mode = true;
        self
    }

    /// Register a node
    ///
    /// The executor takes the current state and returns a partial state
    /// update. Registering a node twice replaces the earlier executor.
    pub fn add_node<F>(mut self, name: impl Into<String>, executor: F) -> Self
    where
        F: Fn(Value) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value>> + Send>>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        self.graph.nodes.insert(
            name.clone(),
            Node {
                name,
                executor: Arc::new(executor),
            },
        );
        self
    }

    /// Add a direct edge; use [`END`](crate::END) to terminate
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.graph.edges.insert(from.into(), Edge::Direct(to.into()));
        self
    }

    /// Add a conditional edge: `router` picks a branch label, `branches` maps
    /// labels to target nodes
    pub fn add_conditional_edge<R>(
        mut self,
        from: impl Into<String>,
        router: R,
        branches: HashMap<String, String>,
    ) -> Self
    where
        R: Fn(&Value) -> String + Send + Sync + 'static,
    {
        let router: RouterFn = Arc::new(router);
        self.graph
            .edges
            .insert(from.into(), Edge::Conditional { router, branches });
        self
    }

    /// Set the entry node, equivalent to `add_edge(START, node)`
    pub fn set_entry(self, node: impl Into<String>) -> Self {
        self.add_edge(START, node)
    }

    /// Validate and compile into a runnable graph
    pub fn compile(self) -> Result<CompiledGraph> {
        self.graph
            .validate()
            .map_err(GraphError::Validation)?;
        Ok(CompiledGraph::new(self.name, self.graph, self.messages_mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::END;
    use serde_json::json;

    #[test]
    fn test_compile_validates() {
        let result = StateGraph::new("empty").compile();
        assert!(matches!(result, Err(GraphError::Validation(_))));
    }

    #[test]
    fn test_compile_linear_graph() {
        let result = StateGraph::new("linear")
            .add_node("only", |state| Box::pin(async move { Ok(state) }))
            .set_entry("only")
            .add_edge("only", END)
            .compile();
        assert!(result.is_ok());
    }

    #[test]
    fn test_add_node_replaces_existing() {
        let compiled = StateGraph::new("replace")
            .add_node("n", |_| Box::pin(async move { Ok(json!({"v": 1})) }))
            .add_node("n", |_| Box::pin(async move { Ok(json!({"v": 2})) }))
            .set_entry("n")
            .add_edge("n", END)
            .compile()
            .unwrap();

        let state = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(compiled.invoke(json!({})))
            .unwrap();
        assert_eq!(state["v"], 2);
    }

    #[test]
    fn test_conditional_edge_requires_known_branches() {
        let result = StateGraph::new("cond")
            .add_node("n", |state| Box::pin(async move { Ok(state) }))
            .set_entry("n")
            .add_conditional_edge(
                "n",
                |_| "go".to_string(),
                HashMap::from([("go".to_string(), "missing".to_string())]),
            )
            .compile();
        assert!(matches!(result, Err(GraphError::Validation(_))));
    }
}
