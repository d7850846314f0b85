//! Scripted chat model for offline runs and tests
//!
//! [`ScriptedModel`] replays a queue of canned assistant messages, one per
//! `chat` call, so graph behavior can be demonstrated and tested without
//! network access or credentials.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use agentflow_core::Message;

use crate::client::{ChatModel, ChatRequest, ChatResponse};
use crate::error::{LlmError, Result};

/// Chat model that answers from a pre-loaded script
pub struct ScriptedModel {
    name: String,
    responses: Mutex<VecDeque<Message>>,
}

impl ScriptedModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    /// Script of plain-text assistant replies, in order
    pub fn with_replies<I, S>(name: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new(name);
        for reply in replies {
            model.push(Message::assistant(reply));
        }
        model
    }

    /// Queue one response; useful for scripting tool-call turns
    pub fn push(&self, message: Message) {
        self.responses.lock().push_back(message);
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

impl std::fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("name", &self.name)
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        let message = self
            .responses
            .lock()
            .pop_front()
            .ok_or(LlmError::ScriptExhausted)?;
        Ok(ChatResponse {
            message,
            model: self.name.clone(),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
