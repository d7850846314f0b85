//! Error types for provider configuration and chat requests

use crate::provider::LlmProvider;

/// Errors raised while resolving configuration or talking to a provider
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("unknown provider '{0}' (expected one of: openai, anthropic, azure, custom)")]
    UnknownProvider(String),

    #[error("missing required configuration for provider '{provider}': {}", .fields.join(", "))]
    MissingConfig {
        provider: LlmProvider,
        fields: Vec<String>,
    },

    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("scripted model has no responses left")]
    ScriptExhausted,
}

impl LlmError {
    /// Whether retrying the same request could plausibly succeed
    ///
    /// Connection problems, timeouts, rate limits and server-side failures
    /// are transient; configuration and authentication errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(err) => err.is_timeout() || err.is_connect(),
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
