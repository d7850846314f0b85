//! Tools: the trait, a registry, and a graph node that executes tool calls
//!
//! A [`Tool`] is a named async operation with a JSON argument schema. Tools
//! are collected in a [`ToolRegistry`]; [`ToolNode`] is a ready-made graph
//! node body that executes the tool calls requested by the last assistant
//! message and appends the results as tool messages.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::{messages_from_state, Message};

/// Errors raised by tool lookup and execution
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },
}

impl ToolError {
    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// An async operation invocable by name with JSON arguments
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the arguments; defaults to an unconstrained object
    fn parameters(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, arguments: Value) -> std::result::Result<Value, ToolError>;
}

/// Declarative description of a tool, as sent to chat models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A set of tools addressable by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name, replacing any previous entry
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Specs for every registered tool, sorted by name
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(&name))
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }
}

/// Graph node body that executes pending tool calls
///
/// Reads the last message from `state.messages`; if it is an assistant
/// message with tool calls, each call is executed in order and answered with
/// a tool message. Failures (unknown tool, bad arguments, execution errors)
/// are reported back to the model as tool messages rather than aborting the
/// graph, so the model can react to them.
#[derive(Debug, Clone)]
pub struct ToolNode {
    registry: ToolRegistry,
}

impl ToolNode {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute pending tool calls and return a `messages` update
    pub async fn run(&self, state: Value) -> crate::error::Result<Value> {
        let messages = messages_from_state(&state);
        let Some(last) = messages.last() else {
            return Ok(serde_json::json!({ "messages": [] }));
        };

        let mut results: Vec<Message> = Vec::with_capacity(last.tool_calls.len());
        for call in &last.tool_calls {
            let content = match self.registry.get(&call.name) {
                Some(tool) => match tool.call(call.arguments.clone()).await {
                    Ok(value) => value.to_string(),
                    Err(err) => {
                        tracing::warn!(tool = %call.name, error = %err, "tool call failed");
                        format!("Error: {err}")
                    }
                },
                None => {
                    tracing::warn!(tool = %call.name, "tool call names unknown tool");
                    format!("Error: unknown tool: {}", call.name)
                }
            };
            results.push(Message::tool(content, &call.id, &call.name));
        }

        Ok(serde_json::json!({ "messages": results }))
    }
}
