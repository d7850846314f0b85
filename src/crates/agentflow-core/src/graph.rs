//! Graph structure: nodes, edges and validation
//!
//! A graph is a set of named async nodes plus, for each node, at most one
//! outgoing edge. Edges are either direct or conditional; a conditional edge
//! carries a router function that inspects state and picks a branch label,
//! which is then mapped to the next node.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

/// Virtual node marking the graph entry
pub const START: &str = "__start__";

/// Virtual node marking graph termination
pub const END: &str = "__end__";

/// Node identifier
pub type NodeId = String;

/// Future returned by node executors
pub type NodeFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// A node body: takes the current state, returns a state update
pub type NodeExecutor = Arc<dyn Fn(Value) -> NodeFuture + Send + Sync>;

/// Router for conditional edges: inspects state, returns a branch label
pub type RouterFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A named node in the graph
#[derive(Clone)]
pub struct Node {
    pub name: NodeId,
    pub executor: NodeExecutor,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("executor", &"<function>")
            .finish()
    }
}

/// Outgoing edge of a node
#[derive(Clone)]
pub enum Edge {
    /// Unconditional transition to the target node
    Direct(NodeId),

    /// Route through `router`; its label selects the target from `branches`
    Conditional {
        router: RouterFn,
        branches: HashMap<String, NodeId>,
    },
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(target) => f.debug_tuple("Direct").field(target).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// The assembled graph, prior to compilation
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) edges: HashMap<NodeId, Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    fn check_target(&self, source: &str, target: &str) -> std::result::Result<(), String> {
        if target == END {
            return Ok(());
        }
        if target == START {
            return Err(format!("edge from '{source}' targets '{START}'"));
        }
        if !self.nodes.contains_key(target) {
            return Err(format!("edge from '{source}' targets unknown node '{target}'"));
        }
        Ok(())
    }

    /// Check the graph is runnable: an entry edge exists, every edge targets
    /// a known node or [`END`], and every node can reach an outgoing edge.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("graph has no nodes".to_string());
        }
        if !self.edges.contains_key(START) {
            return Err("graph has no entry point; call set_entry or add an edge from START".to_string());
        }

        for (source, edge) in &self.edges {
            if source != START && !self.nodes.contains_key(source) {
                return Err(format!("edge from unknown node '{source}'"));
            }
            match edge {
                Edge::Direct(target) => self.check_target(source, target)?,
                Edge::Conditional { branches, .. } => {
                    if branches.is_empty() {
                        return Err(format!("conditional edge from '{source}' has no branches"));
                    }
                    for target in branches.values() {
                        self.check_target(source, target)?;
                    }
                }
            }
        }

        for id in self.nodes.keys() {
            if !self.edges.contains_key(id) {
                return Err(format!("node '{id}' has no outgoing edge; add an edge to '{END}'"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_node(name: &str) -> Node {
        Node {
            name: name.to_string(),
            executor: Arc::new(|state| Box::pin(async move { Ok(state) })),
        }
    }

    fn graph_with(nodes: &[&str]) -> Graph {
        let mut graph = Graph::new();
        for name in nodes {
            graph.nodes.insert(name.to_string(), noop_node(name));
        }
        graph
    }

    #[test]
    fn test_validate_accepts_linear_graph() {
        let mut graph = graph_with(&["a", "b"]);
        graph.edges.insert(START.into(), Edge::Direct("a".into()));
        graph.edges.insert("a".into(), Edge::Direct("b".into()));
        graph.edges.insert("b".into(), Edge::Direct(END.into()));
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_entry() {
        let mut graph = graph_with(&["a"]);
        graph.edges.insert("a".into(), Edge::Direct(END.into()));
        let err = graph.validate().unwrap_err();
        assert!(err.contains("entry"));
    }

    #[test]
    fn test_validate_rejects_unknown_target() {
        let mut graph = graph_with(&["a"]);
        graph.edges.insert(START.into(), Edge::Direct("a".into()));
        graph.edges.insert("a".into(), Edge::Direct("ghost".into()));
        let err = graph.validate().unwrap_err();
        assert!(err.contains("ghost"));
    }

    #[test]
    fn test_validate_rejects_dangling_node() {
        let mut graph = graph_with(&["a", "b"]);
        graph.edges.insert(START.into(), Edge::Direct("a".into()));
        graph.edges.insert("a".into(), Edge::Direct(END.into()));
        let err = graph.validate().unwrap_err();
        assert!(err.contains('b'));
    }

    #[test]
    fn test_validate_rejects_empty_branches() {
        let mut graph = graph_with(&["a"]);
        graph.edges.insert(START.into(), Edge::Direct("a".into()));
        graph.edges.insert(
            "a".into(),
            Edge::Conditional {
                router: Arc::new(|_| "x".to_string()),
                branches: HashMap::new(),
            },
        );
        let err = graph.validate().unwrap_err();
        assert!(err.contains("no branches"));
    }

    #[test]
    fn test_edge_debug_hides_router() {
        let edge = Edge::Conditional {
            router: Arc::new(|_| "done".to_string()),
            branches: HashMap::from([("done".to_string(), END.to_string())]),
        };
        let rendered = format!("{edge:?}");
        assert!(rendered.contains("<function>"));
    }
}
