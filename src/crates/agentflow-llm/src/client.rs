//! Chat model trait and the HTTP chat client
//!
//! [`ChatModel`] is the seam graphs program against; [`ChatClient`] is the
//! production implementation, speaking the OpenAI-compatible chat completions
//! protocol for openai/azure/custom and the Anthropic messages protocol for
//! anthropic. Transient failures (timeouts, rate limits, 5xx) are retried
//! with exponential backoff up to `max_retries` extra attempts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use agentflow_core::{Message, MessageRole, RetryPolicy, ToolCall, ToolSpec};

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";
const ANTHROPIC_DEFAULT_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A conversation to complete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,

    /// Per-request override of the configured temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Per-request override of the configured token budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A completed chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant's reply, possibly carrying tool calls
    pub message: Message,

    /// Model that produced the reply
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Something that can complete a conversation
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    fn model_name(&self) -> &str;
}

/// HTTP chat client for the configured provider
#[derive(Debug, Clone)]
pub struct ChatClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl ChatClient {
    /// Validate the configuration and build the client
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        match self.config.provider {
            LlmProvider::OpenAi => {
                let base = self
                    .config
                    .base_url
                    .as_deref()
                    .unwrap_or(OPENAI_DEFAULT_BASE)
                    .trim_end_matches('/');
                format!("{base}/chat/completions")
            }
            LlmProvider::Custom => {
                let base = self
                    .config
                    .base_url
                    .as_deref()
                    .unwrap_or_default()
                    .trim_end_matches('/');
                format!("{base}/chat/completions")
            }
            LlmProvider::Azure => {
                let base = self
                    .config
                    .base_url
                    .as_deref()
                    .unwrap_or_default()
                    .trim_end_matches('/');
                let deployment = self.config.deployment.as_deref().unwrap_or_default();
                let version = self.config.api_version.as_deref().unwrap_or_default();
                format!("{base}/openai/deployments/{deployment}/chat/completions?api-version={version}")
            }
            LlmProvider::Anthropic => {
                let base = self
                    .config
                    .base_url
                    .as_deref()
                    .unwrap_or(ANTHROPIC_DEFAULT_BASE)
                    .trim_end_matches('/');
                format!("{base}/v1/messages")
            }
        }
    }

    fn openai_message(message: &Message) -> Value {
        let mut body = json!({
            "role": message.role,
            "content": message.content,
        });
        if !message.tool_calls.is_empty() {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        },
                    })
                })
                .collect();
            body["tool_calls"] = Value::Array(calls);
        }
        if let Some(id) = &message.tool_call_id {
            body["tool_call_id"] = json!(id);
        }
        body
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let temperature = request.temperature.unwrap_or(self.config.temperature);
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);

        match self.config.provider {
            LlmProvider::OpenAi | LlmProvider::Azure | LlmProvider::Custom => {
                let messages: Vec<Value> =
                    request.messages.iter().map(Self::openai_message).collect();
                let mut body = json!({
                    "messages": messages,
                    "temperature": temperature,
                    "max_tokens": max_tokens,
                });
                // Azure routes by deployment in the URL, so no model field.
                if self.config.provider != LlmProvider::Azure {
                    if let Some(model) = &self.config.model {
                        body["model"] = json!(model);
                    }
                }
                if !request.tools.is_empty() {
                    let tools: Vec<Value> = request
                        .tools
                        .iter()
                        .map(|spec| {
                            json!({
                                "type": "function",
                                "function": {
                                    "name": spec.name,
                                    "description": spec.description,
                                    "parameters": spec.parameters,
                                },
                            })
                        })
                        .collect();
                    body["tools"] = Value::Array(tools);
                }
                body
            }
            LlmProvider::Anthropic => {
                let system: Vec<&str> = request
                    .messages
                    .iter()
                    .filter(|message| message.role == MessageRole::System)
                    .map(|message| message.content.as_str())
                    .collect();
                let messages: Vec<Value> = request
                    .messages
                    .iter()
                    .filter(|message| message.role != MessageRole::System)
                    .map(|message| {
                        let role = match message.role {
                            MessageRole::Assistant => "assistant",
                            _ => "user",
                        };
                        json!({ "role": role, "content": message.content })
                    })
                    .collect();

                let mut body = json!({
                    "model": self.config.model.as_deref().unwrap_or_default(),
                    "messages": messages,
                    "temperature": temperature,
                    "max_tokens": max_tokens,
                });
                if !system.is_empty() {
                    body["system"] = json!(system.join("\n\n"));
                }
                if !request.tools.is_empty() {
                    let tools: Vec<Value> = request
                        .tools
                        .iter()
                        .map(|spec| {
                            json!({
                                "name": spec.name,
                                "description": spec.description,
                                "input_schema": spec.parameters,
                            })
                        })
                        .collect();
                    body["tools"] = Value::Array(tools);
                }
                body
            }
        }
    }

    fn parse_openai_response(&self, body: Value) -> Result<ChatResponse> {
        let choice = body["choices"]
            .get(0)
            .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))?;
        let raw = &choice["message"];

        let content = raw["content"].as_str().unwrap_or_default().to_string();
        let mut message = Message::assistant(content);

        if let Some(calls) = raw["tool_calls"].as_array() {
            let tool_calls: Vec<ToolCall> = calls
                .iter()
                .map(|call| {
                    let arguments_raw = call["function"]["arguments"].as_str().unwrap_or("{}");
                    let arguments = serde_json::from_str(arguments_raw)
                        .unwrap_or_else(|_| Value::String(arguments_raw.to_string()));
                    ToolCall {
                        id: call["id"].as_str().unwrap_or_default().to_string(),
                        name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
                        arguments,
                    }
                })
                .collect();
            message.tool_calls = tool_calls;
        }

        let usage = body.get("usage").map(|usage| Usage {
            prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
        });

        let model = body["model"]
            .as_str()
            .map(str::to_string)
            .or_else(|| self.config.model.clone())
            .unwrap_or_default();

        Ok(ChatResponse {
            message,
            model,
            usage,
        })
    }

    fn parse_anthropic_response(&self, body: Value) -> Result<ChatResponse> {
        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| LlmError::MalformedResponse("no content in response".to_string()))?;

        let mut text_parts: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        for block in blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        text_parts.push(text.to_string());
                    }
                }
                Some("tool_use") => {
                    tool_calls.push(ToolCall {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                        arguments: block["input"].clone(),
                    });
                }
                _ => {}
            }
        }

        let mut message = Message::assistant(text_parts.join(""));
        message.tool_calls = tool_calls;

        let usage = body.get("usage").map(|usage| {
            let prompt = usage["input_tokens"].as_u64().unwrap_or(0) as u32;
            let completion = usage["output_tokens"].as_u64().unwrap_or(0) as u32;
            Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }
        });

        let model = body["model"]
            .as_str()
            .map(str::to_string)
            .or_else(|| self.config.model.clone())
            .unwrap_or_default();

        Ok(ChatResponse {
            message,
            model,
            usage,
        })
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint();
        let body = self.request_body(request);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let builder = self.http.post(&url).json(&body);
        let builder = match self.config.provider {
            LlmProvider::OpenAi | LlmProvider::Custom => {
                builder.header("Authorization", format!("Bearer {api_key}"))
            }
            LlmProvider::Azure => builder.header("api-key", api_key),
            LlmProvider::Anthropic => builder
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        match self.config.provider {
            LlmProvider::Anthropic => self.parse_anthropic_response(body),
            _ => self.parse_openai_response(body),
        }
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let policy = RetryPolicy::new(self.config.max_retries + 1).with_initial_interval(0.5);
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && policy.should_retry(attempts) => {
                    let delay = policy.calculate_delay(attempts - 1);
                    tracing::warn!(
                        provider = %self.config.provider,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "chat request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn model_name(&self) -> &str {
        self.config.model.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_client() -> ChatClient {
        ChatClient::new(LlmConfig::new(LlmProvider::OpenAi).with_api_key("sk-test")).unwrap()
    }

    fn azure_client() -> ChatClient {
        ChatClient::new(
            LlmConfig::new(LlmProvider::Azure)
                .with_api_key("key")
                .with_base_url("https://example.openai.azure.com/")
                .with_deployment("gpt-4o-prod"),
        )
        .unwrap()
    }

    fn anthropic_client() -> ChatClient {
        ChatClient::new(LlmConfig::new(LlmProvider::Anthropic).with_api_key("key")).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = ChatClient::new(LlmConfig::new(LlmProvider::OpenAi)).unwrap_err();
        assert!(matches!(err, LlmError::MissingConfig { .. }));
    }

    #[test]
    fn test_endpoints_per_provider() {
        assert_eq!(
            openai_client().endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            azure_client().endpoint(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o-prod/chat/completions?api-version=2024-02-15-preview"
        );
        assert_eq!(
            anthropic_client().endpoint(),
            "https://api.anthropic.com/v1/messages"
        );

        let custom = ChatClient::new(
            LlmConfig::new(LlmProvider::Custom)
                .with_api_key("key")
                .with_base_url("http://localhost:8080/v1")
                .with_model("local-model"),
        )
        .unwrap();
        assert_eq!(custom.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_openai_body_includes_model_and_tools() {
        let client = openai_client();
        let request = ChatRequest::new(vec![Message::user("hi")]).with_tools(vec![ToolSpec {
            name: "search".to_string(),
            description: "Search things".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }]);

        let body = client.request_body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["tools"][0]["function"]["name"], "search");
    }

    #[test]
    fn test_azure_body_omits_model() {
        let body = azure_client().request_body(&ChatRequest::new(vec![Message::user("hi")]));
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_openai_body_maps_tool_messages() {
        let client = openai_client();
        let call = ToolCall::new("search", json!({"q": "rust"}));
        let call_id = call.id.clone();
        let request = ChatRequest::new(vec![
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool("found it", &call_id, "search"),
        ]);

        let body = client.request_body(&request);
        assert_eq!(body["messages"][0]["tool_calls"][0]["function"]["name"], "search");
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["tool_call_id"], call_id);
    }

    #[test]
    fn test_anthropic_body_lifts_system_prompt() {
        let client = anthropic_client();
        let request = ChatRequest::new(vec![
            Message::system("be brief"),
            Message::user("hello"),
        ]);

        let body = client.request_body(&request);
        assert_eq!(body["system"], "be brief");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");

        let no_system = client.request_body(&ChatRequest::new(vec![Message::user("hi")]));
        assert!(no_system.get("system").is_none());
    }

    #[test]
    fn test_parse_openai_response() {
        let client = openai_client();
        let body = json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "hello there",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "search", "arguments": "{\"q\":\"rust\"}"},
                    }],
                },
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
        });

        let response = client.parse_openai_response(body).unwrap();
        assert_eq!(response.message.content, "hello there");
        assert_eq!(response.message.tool_calls.len(), 1);
        assert_eq!(response.message.tool_calls[0].arguments["q"], "rust");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_openai_response_without_choices() {
        let err = openai_client().parse_openai_response(json!({})).unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_anthropic_response() {
        let client = anthropic_client();
        let body = json!({
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "text", "text": "checking the weather"},
                {"type": "tool_use", "id": "tu_1", "name": "weather", "input": {"city": "paris"}},
            ],
            "usage": {"input_tokens": 12, "output_tokens": 8},
        });

        let response = client.parse_anthropic_response(body).unwrap();
        assert_eq!(response.message.content, "checking the weather");
        assert_eq!(response.message.tool_calls[0].name, "weather");
        assert_eq!(response.message.tool_calls[0].arguments["city"], "paris");
        assert_eq!(response.usage.unwrap().total_tokens, 20);
    }
}
