//! Chat message types and reducers
//!
//! Graph state is JSON, but message-based agents share a convention: a
//! `messages` array of [`Message`] objects. This module provides the message
//! type, the `add_messages` reducer used by
//! [`StateGraph::with_messages`](crate::StateGraph::with_messages), and
//! helpers for reading messages out of raw state.
//!
//! Every message carries a stable id; `add_messages` appends new messages and
//! *replaces* an existing message when an incoming one reuses its id. That is
//! what lets nodes rewrite history (e.g. trimming, redaction) instead of only
//! appending.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool invocation requested by an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id, echoed back by the matching tool message
    pub id: String,

    /// Tool name to invoke
    pub name: String,

    /// JSON arguments for the tool
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }
}

fn default_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable id used for reducer deduplication
    #[serde(default = "default_id")]
    pub id: String,

    pub role: MessageRole,

    pub content: String,

    /// Tool invocations requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// For tool messages: the id of the call being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// For tool messages: the name of the tool that produced this result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: default_id(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Assistant message that requests tool invocations
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        let mut message = Self::new(MessageRole::Assistant, content);
        message.tool_calls = tool_calls;
        message
    }

    /// Tool result answering the call with id `tool_call_id`
    pub fn tool(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        let mut message = Self::new(MessageRole::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message.name = Some(tool_name.into());
        message
    }

    /// Replace the generated id (for reducer-based rewrites)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Reducer for `messages` channels: append new messages, replace by id
pub fn add_messages(left: Vec<Message>, right: Vec<Message>) -> Vec<Message> {
    let mut merged = left;
    for incoming in right {
        match merged.iter_mut().find(|existing| existing.id == incoming.id) {
            Some(existing) => *existing = incoming,
            None => merged.push(incoming),
        }
    }
    merged
}

/// Trim a conversation to a leading system message plus the last `keep_last`
/// other messages
///
/// Keeps context windows bounded in long-running threads; the system prompt,
/// when present as the first message, always survives.
pub fn trim_messages(messages: &[Message], keep_last: usize) -> Vec<Message> {
    let system_head = messages
        .first()
        .filter(|message| message.role == MessageRole::System);

    let rest: Vec<&Message> = messages
        .iter()
        .skip(usize::from(system_head.is_some()))
        .collect();

    let tail_start = rest.len().saturating_sub(keep_last);
    system_head
        .into_iter()
        .chain(rest.into_iter().skip(tail_start))
        .cloned()
        .collect()
}

/// Read the `messages` array out of raw graph state
///
/// Entries that do not parse as messages are skipped.
pub fn messages_from_state(state: &Value) -> Vec<Message> {
    state
        .get("messages")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Serialize messages back into a state fragment: `{"messages": [...]}`
pub fn messages_to_state(messages: &[Message]) -> Value {
    serde_json::json!({ "messages": messages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors_set_roles() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        assert_eq!(Message::assistant("a").role, MessageRole::Assistant);

        let tool = Message::tool("42", "call-1", "calculator");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(tool.name.as_deref(), Some("calculator"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let text = serde_json::to_string(&Message::user("hi")).unwrap();
        assert!(text.contains("\"role\":\"user\""));
    }

    #[test]
    fn test_deserialize_without_id_generates_one() {
        let message: Message =
            serde_json::from_value(json!({"role": "user", "content": "hi"})).unwrap();
        assert!(!message.id.is_empty());
    }

    #[test]
    fn test_add_messages_appends() {
        let left = vec![Message::user("one")];
        let right = vec![Message::assistant("two")];
        let merged = add_messages(left, right);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].content, "two");
    }

    #[test]
    fn test_add_messages_replaces_by_id() {
        let original = Message::assistant("draft");
        let id = original.id.clone();
        let merged = add_messages(
            vec![Message::user("q"), original],
            vec![Message::assistant("final").with_id(&id)],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].content, "final");
        assert_eq!(merged[1].id, id);
    }

    #[test]
    fn test_trim_keeps_system_and_tail() {
        let mut messages = vec![Message::system("rules")];
        for i in 0..20 {
            messages.push(Message::user(format!("m{i}")));
        }

        let trimmed = trim_messages(&messages, 10);
        assert_eq!(trimmed.len(), 11);
        assert_eq!(trimmed[0].role, MessageRole::System);
        assert_eq!(trimmed[1].content, "m10");
        assert_eq!(trimmed[10].content, "m19");
    }

    #[test]
    fn test_trim_without_system_message() {
        let messages: Vec<Message> = (0..5).map(|i| Message::user(format!("m{i}"))).collect();
        let trimmed = trim_messages(&messages, 2);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].content, "m3");
    }

    #[test]
    fn test_trim_shorter_than_limit_is_identity() {
        let messages = vec![Message::system("s"), Message::user("u")];
        let trimmed = trim_messages(&messages, 10);
        assert_eq!(trimmed.len(), 2);
    }

    #[test]
    fn test_messages_from_state_skips_invalid_entries() {
        let state = json!({
            "messages": [
                {"role": "user", "content": "ok"},
                {"bogus": true},
            ],
            "other": 1,
        });
        let messages = messages_from_state(&state);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "ok");

        assert!(messages_from_state(&json!({})).is_empty());
    }

    #[test]
    fn test_messages_to_state_roundtrip() {
        let messages = vec![Message::user("hello")];
        let state = messages_to_state(&messages);
        assert_eq!(messages_from_state(&state), messages);
    }
}
