//! Error types for graph construction and execution

use thiserror::Error;

use crate::tool::ToolError;

/// Errors produced while building or running a graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure is invalid (bad edge, missing entry, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Execution reached a node id that was never added
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A node executor returned an error
    #[error("Node '{node}' failed: {message}")]
    NodeExecution { node: String, message: String },

    /// Execution paused before an interrupt point; resume via the same thread
    #[error("Execution interrupted before node '{node}'")]
    Interrupted { node: String },

    /// The run exceeded its superstep budget (likely an unbounded cycle)
    #[error("Recursion limit of {0} supersteps reached")]
    RecursionLimit(usize),

    /// Checkpoint or store backend failure
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] agentflow_checkpoint::StorageError),

    /// State could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tool invocation failure escalated out of a node
    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl GraphError {
    /// Convenience constructor for node failures
    pub fn node_execution(node: impl Into<String>, message: impl Into<String>) -> Self {
        GraphError::NodeExecution {
            node: node.into(),
            message: message.into(),
        }
    }
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::UnknownNode("ghost".to_string());
        assert_eq!(err.to_string(), "Unknown node: ghost");

        let err = GraphError::node_execution("chat", "model unavailable");
        assert_eq!(err.to_string(), "Node 'chat' failed: model unavailable");

        let err = GraphError::Interrupted {
            node: "approve".to_string(),
        };
        assert!(err.to_string().contains("approve"));
    }

    #[test]
    fn test_from_storage_error() {
        let storage = agentflow_checkpoint::StorageError::Backend("down".to_string());
        let err: GraphError = storage.into();
        assert!(matches!(err, GraphError::Checkpoint(_)));
    }
}
