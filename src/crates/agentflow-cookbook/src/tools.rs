//! Demo tools used throughout the chapters
//!
//! These implement [`Tool`] against canned data so every chapter runs
//! offline. [`GuardedTool`] and [`FlakyTool`] exist to demonstrate
//! permission gating and retry behavior rather than to do useful work.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use agentflow_core::{Tool, ToolError, ToolRegistry};

/// (kind, name, detail) rows behind [`DatabaseSearchTool`]
const DATABASE_ROWS: &[(&str, &str, &str)] = &[
    ("customer", "Acme Corp", "enterprise plan, 120 seats"),
    ("customer", "Globex", "trial plan, 5 seats"),
    ("customer", "Initech", "pro plan, 40 seats"),
    ("product", "Copper Widget", "in stock, 4999 units"),
    ("product", "Steel Flange", "backordered"),
    ("product", "Brass Fitting", "in stock, 152 units"),
];

/// Case-insensitive search over a small canned database
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseSearchTool;

#[async_trait]
impl Tool for DatabaseSearchTool {
    fn name(&self) -> &str {
        "database_search"
    }

    fn description(&self) -> &str {
        "Search the customer and product database by keyword"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search terms" }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolError::invalid_arguments("database_search", "missing required field 'query'")
            })?;
        let needle = query.to_ascii_lowercase();

        let matches: Vec<Value> = DATABASE_ROWS
            .iter()
            .filter(|(kind, name, detail)| {
                kind.contains(&needle)
                    || name.to_ascii_lowercase().contains(&needle)
                    || detail.to_ascii_lowercase().contains(&needle)
            })
            .map(|(kind, name, detail)| {
                json!({ "kind": kind, "name": name, "detail": detail })
            })
            .collect();

        Ok(json!({
            "query": query,
            "count": matches.len(),
            "matches": matches,
        }))
    }
}

/// Pretend email sender; validates the address and reports a message id
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailTool;

#[async_trait]
impl Tool for EmailTool {
    fn name(&self) -> &str {
        "email_send"
    }

    fn description(&self) -> &str {
        "Send an email to a recipient"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "description": "Recipient address" },
                "subject": { "type": "string" },
                "body": { "type": "string" }
            },
            "required": ["to", "subject"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let to = arguments
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid_arguments("email_send", "missing required field 'to'"))?;
        if !to.contains('@') {
            return Err(ToolError::invalid_arguments(
                "email_send",
                format!("'{to}' is not a valid email address"),
            ));
        }
        let subject = arguments
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or("(no subject)");

        // Simulated network delay so retry timing demos feel realistic.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Ok(json!({
            "status": "sent",
            "message_id": Uuid::new_v4().to_string(),
            "to": to,
            "subject": subject,
        }))
    }
}

const WEATHER: &[(&str, &str, i64)] = &[
    ("london", "light rain", 14),
    ("tokyo", "clear", 22),
    ("san francisco", "fog", 16),
    ("sydney", "sunny", 24),
];

/// Canned weather lookup keyed by city name
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather_lookup"
    }

    fn description(&self) -> &str {
        "Look up current weather for a city"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string", "description": "City name" }
            },
            "required": ["city"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let city = arguments
            .get("city")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolError::invalid_arguments("weather_lookup", "missing required field 'city'")
            })?;
        let key = city.trim().to_ascii_lowercase();

        let (conditions, temperature) = WEATHER
            .iter()
            .find(|(name, _, _)| *name == key)
            .map(|(_, conditions, temperature)| (*conditions, *temperature))
            .unwrap_or(("partly cloudy", 18));

        Ok(json!({
            "city": city,
            "conditions": conditions,
            "temperature_c": temperature,
        }))
    }
}

/// Wraps a tool behind a named permission
///
/// Calls are refused with an execution error unless the permission was
/// granted at construction time. Name, description and schema pass through
/// unchanged so the wrapped tool is indistinguishable to a model.
pub struct GuardedTool {
    inner: Arc<dyn Tool>,
    required: String,
    granted: HashSet<String>,
}

impl GuardedTool {
    pub fn new(inner: Arc<dyn Tool>, required: impl Into<String>) -> Self {
        Self {
            inner,
            required: required.into(),
            granted: HashSet::new(),
        }
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.granted.insert(permission.into());
        self
    }
}

impl std::fmt::Debug for GuardedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedTool")
            .field("tool", &self.inner.name())
            .field("required", &self.required)
            .field("granted", &self.granted)
            .finish()
    }
}

#[async_trait]
impl Tool for GuardedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn parameters(&self) -> Value {
        self.inner.parameters()
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        if !self.granted.contains(&self.required) {
            return Err(ToolError::execution(
                self.inner.name(),
                format!("permission '{}' not granted", self.required),
            ));
        }
        self.inner.call(arguments).await
    }
}

/// How a [`FlakyTool`] decides to fail
#[derive(Debug, Clone, Copy)]
enum FlakyMode {
    /// Fail the first n calls, then succeed forever
    FailFirst(usize),
    /// Fail each call independently with this probability
    Random(f64),
}

/// A tool that fails on purpose, for exercising retry handling
pub struct FlakyTool {
    name: String,
    mode: FlakyMode,
    calls: AtomicUsize,
}

impl FlakyTool {
    /// Fails the first `failures` calls, then succeeds
    pub fn failing_first(name: impl Into<String>, failures: usize) -> Self {
        Self {
            name: name.into(),
            mode: FlakyMode::FailFirst(failures),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails each call with probability `rate` (clamped to 0..=1)
    pub fn with_failure_rate(name: impl Into<String>, rate: f64) -> Self {
        Self {
            name: name.into(),
            mode: FlakyMode::Random(rate.clamp(0.0, 1.0)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Total calls observed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for FlakyTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakyTool")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("calls", &self.calls())
            .finish()
    }
}

#[async_trait]
impl Tool for FlakyTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "An unreliable operation that sometimes fails"
    }

    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = match self.mode {
            FlakyMode::FailFirst(failures) => call <= failures,
            FlakyMode::Random(rate) => rand::random::<f64>() < rate,
        };
        if fail {
            return Err(ToolError::execution(
                &self.name,
                format!("transient failure on call {call}"),
            ));
        }
        Ok(json!({ "status": "ok", "call": call }))
    }
}

/// The registry the chapters run against
pub fn demo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DatabaseSearchTool));
    registry.register(Arc::new(EmailTool));
    registry.register(Arc::new(WeatherTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_search_matches_case_insensitively() {
        let result = DatabaseSearchTool
            .call(json!({"query": "ACME"}))
            .await
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["matches"][0]["name"], "Acme Corp");
    }

    #[tokio::test]
    async fn test_database_search_requires_query() {
        let err = DatabaseSearchTool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_email_rejects_bad_address() {
        let err = EmailTool
            .call(json!({"to": "nobody", "subject": "hi"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a valid email address"));
    }

    #[tokio::test]
    async fn test_email_reports_message_id() {
        let result = EmailTool
            .call(json!({"to": "ops@example.com", "subject": "hi"}))
            .await
            .unwrap();
        assert_eq!(result["status"], "sent");
        assert!(result["message_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_weather_defaults_unknown_city() {
        let result = WeatherTool
            .call(json!({"city": "Reykjavik"}))
            .await
            .unwrap();
        assert_eq!(result["conditions"], "partly cloudy");
    }

    #[tokio::test]
    async fn test_guarded_tool_refuses_without_permission() {
        let guarded = GuardedTool::new(Arc::new(WeatherTool), "weather.read");
        let err = guarded.call(json!({"city": "london"})).await.unwrap_err();
        assert!(err.to_string().contains("permission 'weather.read' not granted"));
    }

    #[tokio::test]
    async fn test_guarded_tool_passes_through_when_granted() {
        let guarded =
            GuardedTool::new(Arc::new(WeatherTool), "weather.read").grant("weather.read");
        let result = guarded.call(json!({"city": "london"})).await.unwrap();
        assert_eq!(result["conditions"], "light rain");
        assert_eq!(guarded.name(), "weather_lookup");
    }

    #[tokio::test]
    async fn test_flaky_fail_first_then_succeeds() {
        let flaky = FlakyTool::failing_first("unstable", 2);
        assert!(flaky.call(json!({})).await.is_err());
        assert!(flaky.call(json!({})).await.is_err());
        assert!(flaky.call(json!({})).await.is_ok());
        assert_eq!(flaky.calls(), 3);
    }

    #[test]
    fn test_demo_registry_contents() {
        let registry = demo_registry();
        assert_eq!(
            registry.names(),
            vec!["database_search", "email_send", "weather_lookup"]
        );
    }
}
