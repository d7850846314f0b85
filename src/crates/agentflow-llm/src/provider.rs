//! Supported chat-model providers

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// A chat-model provider
///
/// Selection is driven by the `DEFAULT_LLM_PROVIDER` environment variable;
/// see [`LlmConfig::resolve`](crate::LlmConfig::resolve).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Azure,
    Custom,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 4] = [
        LlmProvider::OpenAi,
        LlmProvider::Anthropic,
        LlmProvider::Azure,
        LlmProvider::Custom,
    ];

    /// Stable lowercase name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Azure => "azure",
            LlmProvider::Custom => "custom",
        }
    }
}

impl Default for LlmProvider {
    fn default() -> Self {
        LlmProvider::OpenAi
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "anthropic" => Ok(LlmProvider::Anthropic),
            "azure" => Ok(LlmProvider::Azure),
            "custom" => Ok(LlmProvider::Custom),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!(" azure ".parse::<LlmProvider>().unwrap(), LlmProvider::Azure);
        assert_eq!(
            "ANTHROPIC".parse::<LlmProvider>().unwrap(),
            LlmProvider::Anthropic
        );
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let err = "gemini".parse::<LlmProvider>().unwrap_err();
        assert!(matches!(err, LlmError::UnknownProvider(_)));
        assert!(err.to_string().contains("gemini"));
    }

    #[test]
    fn test_display_roundtrips() {
        for provider in LlmProvider::ALL {
            assert_eq!(
                provider.as_str().parse::<LlmProvider>().unwrap(),
                provider
            );
        }
    }
}
