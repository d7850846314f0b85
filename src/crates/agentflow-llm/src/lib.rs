//! # agentflow-llm
//!
//! Provider configuration and chat clients for agentflow graphs.
//!
//! Configuration comes from the environment, one variable set per provider,
//! selected by `DEFAULT_LLM_PROVIDER`:
//!
//! ```no_run
//! use agentflow_llm::{ChatClient, ChatModel, ChatRequest, LlmConfig};
//! use agentflow_core::Message;
//!
//! # async fn run() -> agentflow_llm::Result<()> {
//! let config = LlmConfig::resolve()?;
//! let client = ChatClient::new(config)?;
//!
//! let response = client
//!     .chat(ChatRequest::new(vec![Message::user("hello")]))
//!     .await?;
//! println!("{}", response.message.content);
//! # Ok(())
//! # }
//! ```
//!
//! For offline work, [`ScriptedModel`] implements the same [`ChatModel`]
//! trait from a queue of canned replies.

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod scripted;

pub use client::{ChatClient, ChatModel, ChatRequest, ChatResponse, Usage};
pub use config::{LlmConfig, DEFAULT_PROVIDER_VAR};
pub use error::{LlmError, Result};
pub use provider::LlmProvider;
pub use scripted::ScriptedModel;
