//! Provider configuration resolved from the environment
//!
//! Each provider reads its own set of environment variables; defaults cover
//! everything except credentials and endpoints. Resolution never consults a
//! global registry: [`LlmConfig::resolve`] builds a value that callers own
//! and pass around, and overrides go through consuming `with_*` builders
//! rather than field patching.
//!
//! | Provider  | Variables |
//! |-----------|-----------|
//! | openai    | `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`, `OPENAI_TEMPERATURE`, `OPENAI_MAX_TOKENS` |
//! | anthropic | `ANTHROPIC_API_KEY`, `ANTHROPIC_BASE_URL`, `ANTHROPIC_MODEL`, `ANTHROPIC_TEMPERATURE`, `ANTHROPIC_MAX_TOKENS` |
//! | azure     | `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_VERSION`, `AZURE_OPENAI_DEPLOYMENT_NAME`, `AZURE_OPENAI_MODEL` |
//! | custom    | `CUSTOM_LLM_API_KEY`, `CUSTOM_LLM_BASE_URL`, `CUSTOM_LLM_MODEL` |

use std::str::FromStr;
use std::time::Duration;

use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;

/// Variable naming the provider [`LlmConfig::resolve`] should use
pub const DEFAULT_PROVIDER_VAR: &str = "DEFAULT_LLM_PROVIDER";

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_AZURE_MODEL: &str = "gpt-4o";
const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";
const DEFAULT_TEMPERATURE: f64 = 0.1;
const DEFAULT_MAX_TOKENS: u32 = 4000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_RETRIES: usize = 2;

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw.parse().map_err(|err| LlmError::InvalidValue {
            name: name.to_string(),
            message: format!("{err}"),
        }),
        None => Ok(default),
    }
}

/// Everything needed to construct a chat client for one provider
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Azure only
    pub api_version: Option<String>,
    /// Azure only
    pub deployment: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl LlmConfig {
    /// Configuration with provider-appropriate defaults and no credentials
    pub fn new(provider: LlmProvider) -> Self {
        let model = match provider {
            LlmProvider::OpenAi => Some(DEFAULT_OPENAI_MODEL.to_string()),
            LlmProvider::Anthropic => Some(DEFAULT_ANTHROPIC_MODEL.to_string()),
            LlmProvider::Azure => Some(DEFAULT_AZURE_MODEL.to_string()),
            LlmProvider::Custom => None,
        };
        let api_version = matches!(provider, LlmProvider::Azure)
            .then(|| DEFAULT_AZURE_API_VERSION.to_string());

        Self {
            provider,
            api_key: None,
            base_url: None,
            model,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_version,
            deployment: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Resolve configuration for the provider named by
    /// `DEFAULT_LLM_PROVIDER` (default: openai)
    pub fn resolve() -> Result<Self> {
        let provider = match env_string(DEFAULT_PROVIDER_VAR) {
            Some(name) => name.parse()?,
            None => LlmProvider::default(),
        };
        Self::from_env(provider)
    }

    /// Read the given provider's configuration from the environment
    ///
    /// Missing credentials do not fail here; call
    /// [`validate`](LlmConfig::validate) (or construct a
    /// [`ChatClient`](crate::ChatClient), which validates) to enforce the
    /// required fields.
    pub fn from_env(provider: LlmProvider) -> Result<Self> {
        let mut config = Self::new(provider);
        match provider {
            LlmProvider::OpenAi => {
                config.api_key = env_string("OPENAI_API_KEY");
                config.base_url = env_string("OPENAI_BASE_URL");
                if let Some(model) = env_string("OPENAI_MODEL") {
                    config.model = Some(model);
                }
                config.temperature = env_parse("OPENAI_TEMPERATURE", config.temperature)?;
                config.max_tokens = env_parse("OPENAI_MAX_TOKENS", config.max_tokens)?;
            }
            LlmProvider::Anthropic => {
                config.api_key = env_string("ANTHROPIC_API_KEY");
                config.base_url = env_string("ANTHROPIC_BASE_URL");
                if let Some(model) = env_string("ANTHROPIC_MODEL") {
                    config.model = Some(model);
                }
                config.temperature = env_parse("ANTHROPIC_TEMPERATURE", config.temperature)?;
                config.max_tokens = env_parse("ANTHROPIC_MAX_TOKENS", config.max_tokens)?;
            }
            LlmProvider::Azure => {
                config.api_key = env_string("AZURE_OPENAI_API_KEY");
                config.base_url = env_string("AZURE_OPENAI_ENDPOINT");
                if let Some(model) = env_string("AZURE_OPENAI_MODEL") {
                    config.model = Some(model);
                }
                if let Some(version) = env_string("AZURE_OPENAI_API_VERSION") {
                    config.api_version = Some(version);
                }
                config.deployment = env_string("AZURE_OPENAI_DEPLOYMENT_NAME");
            }
            LlmProvider::Custom => {
                config.api_key = env_string("CUSTOM_LLM_API_KEY");
                config.base_url = env_string("CUSTOM_LLM_BASE_URL");
                config.model = env_string("CUSTOM_LLM_MODEL");
            }
        }
        Ok(config)
    }

    /// Check the fields this provider cannot work without
    ///
    /// openai/anthropic require `api_key` and `model`; azure requires
    /// `api_key`, `base_url` and `deployment`; custom requires `api_key`,
    /// `base_url` and `model`.
    pub fn validate(&self) -> Result<()> {
        let mut missing: Vec<String> = Vec::new();
        let mut require = |name: &str, present: bool| {
            if !present {
                missing.push(name.to_string());
            }
        };

        require("api_key", self.api_key.is_some());
        match self.provider {
            LlmProvider::OpenAi | LlmProvider::Anthropic => {
                require("model", self.model.is_some());
            }
            LlmProvider::Azure => {
                require("base_url", self.base_url.is_some());
                require("deployment", self.deployment.is_some());
            }
            LlmProvider::Custom => {
                require("base_url", self.base_url.is_some());
                require("model", self.model.is_some());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LlmError::MissingConfig {
                provider: self.provider,
                fields: missing,
            })
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

fn redact(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        let prefix: String = secret.chars().take(4).collect();
        format!("{prefix}****")
    }
}

// Hand-written so the api key never reaches logs in the clear.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_deref().map(redact))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
