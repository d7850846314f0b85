//! Resilient tool invocation
//!
//! [`ToolExecutor`] wraps registry lookups with bounded retry and
//! exponential backoff, reporting a structured [`CallOutcome`] instead of an
//! error for ordinary failures. Only an unknown tool name is a programmer
//! error worth returning `Err` for. [`ToolDispatcher`] and [`ToolChain`]
//! build keyword routing and pipelines on top of it.

use std::time::Duration;

use serde_json::Value;

use agentflow_core::{ToolError, ToolRegistry};

use crate::error::Result;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Structured result of one (possibly retried) tool invocation
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CallOutcome {
    pub succeeded: bool,
    pub payload: Option<Value>,
    pub error: Option<String>,
    pub attempts_used: usize,
}

impl CallOutcome {
    fn success(payload: Value, attempts_used: usize) -> Self {
        Self {
            succeeded: true,
            payload: Some(payload),
            error: None,
            attempts_used,
        }
    }

    fn failure(error: String, attempts_used: usize) -> Self {
        Self {
            succeeded: false,
            payload: None,
            error: Some(error),
            attempts_used,
        }
    }
}

/// Invokes registry tools with bounded retry and exponential backoff
///
/// Waits `base_delay * 2^n` after the n-th failed attempt (counting from
/// zero), so with the defaults a three-attempt call sleeps 1s then 2s before
/// giving up.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: ToolRegistry,
    max_attempts: usize,
    base_delay: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Attempt ceiling per call; clamped to at least one
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn delay_for(&self, attempt_index: usize) -> Duration {
        // Doubling saturates at 2^32 to keep mul_f64 finite.
        let factor = 2f64.powi(attempt_index.min(32) as i32);
        self.base_delay.mul_f64(factor)
    }

    /// Invoke one tool, retrying failures up to the attempt ceiling
    ///
    /// Returns `Err` only when `name` is not registered. Every other failure
    /// ends up inside the returned [`CallOutcome`].
    pub async fn call(&self, name: &str, arguments: Value) -> Result<CallOutcome> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match tool.call(arguments.clone()).await {
                Ok(payload) => {
                    if attempt > 1 {
                        tracing::info!(tool = name, attempt, "tool call succeeded after retries");
                    }
                    return Ok(CallOutcome::success(payload, attempt));
                }
                Err(err) => {
                    last_error = err.to_string();
                    if attempt < self.max_attempts {
                        let delay = self.delay_for(attempt - 1);
                        tracing::warn!(
                            tool = name,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_error,
                            "tool call failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        tracing::warn!(
                            tool = name,
                            attempts = self.max_attempts,
                            error = %last_error,
                            "tool call failed, attempts exhausted"
                        );
                    }
                }
            }
        }

        Ok(CallOutcome::failure(last_error, self.max_attempts))
    }

    /// Invoke calls in order, halting after the first failed outcome
    ///
    /// The failed outcome is included in the returned list; later calls are
    /// never attempted.
    pub async fn call_sequential(&self, calls: &[(String, Value)]) -> Result<Vec<CallOutcome>> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for (name, arguments) in calls {
            let outcome = self.call(name, arguments.clone()).await?;
            let failed = !outcome.succeeded;
            outcomes.push(outcome);
            if failed {
                tracing::warn!(tool = %name, "sequential run halted on failed call");
                break;
            }
        }
        Ok(outcomes)
    }

    /// Invoke calls concurrently, one outcome per call in input order
    ///
    /// All names are checked against the registry before anything runs, so an
    /// unknown tool fails the whole batch without side effects.
    pub async fn call_parallel(&self, calls: &[(String, Value)]) -> Result<Vec<CallOutcome>> {
        for (name, _) in calls {
            if !self.registry.contains(name) {
                return Err(ToolError::UnknownTool(name.clone()).into());
            }
        }

        let pending = calls
            .iter()
            .map(|(name, arguments)| self.call(name, arguments.clone()));
        futures::future::join_all(pending).await.into_iter().collect()
    }
}

/// Keyword rules routing a request to one registered tool
///
/// Rules are tried in insertion order and the first match wins. Input that
/// matches no rule takes the default path: no tool runs and the dispatch
/// carries the label `"unknown"`.
#[derive(Debug, Clone, Default)]
pub struct ToolDispatcher {
    rules: Vec<DispatchRule>,
}

#[derive(Debug, Clone)]
struct DispatchRule {
    label: String,
    keywords: Vec<String>,
    tool: String,
    arguments: Value,
}

/// Where a request was routed, and what the tool returned
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Dispatch {
    /// Matching rule's label, or `"unknown"` on the default path
    pub label: String,
    /// Tool the request was routed to; `None` on the default path
    pub tool: Option<String>,
    /// Invocation result; `None` on the default path
    pub outcome: Option<CallOutcome>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule matching any of `keywords` as case-insensitive substrings
    pub fn rule(
        mut self,
        label: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
        tool: impl Into<String>,
        arguments: Value,
    ) -> Self {
        self.rules.push(DispatchRule {
            label: label.into(),
            keywords: keywords
                .into_iter()
                .map(|keyword| {
                    let keyword: String = keyword.into();
                    keyword.to_lowercase()
                })
                .collect(),
            tool: tool.into(),
            arguments,
        });
        self
    }

    fn matching_rule(&self, input: &str) -> Option<&DispatchRule> {
        let lowered = input.to_lowercase();
        self.rules.iter().find(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| lowered.contains(keyword.as_str()))
        })
    }

    /// Label of the first matching rule, or `None`
    pub fn classify(&self, input: &str) -> Option<&str> {
        self.matching_rule(input).map(|rule| rule.label.as_str())
    }

    /// Route `input` through the executor to the matching rule's tool
    ///
    /// `Err` keeps its [`ToolExecutor::call`] meaning: a rule naming an
    /// unregistered tool.
    pub async fn dispatch(&self, executor: &ToolExecutor, input: &str) -> Result<Dispatch> {
        match self.matching_rule(input) {
            Some(rule) => {
                tracing::debug!(label = %rule.label, tool = %rule.tool, "request matched dispatch rule");
                let outcome = executor.call(&rule.tool, rule.arguments.clone()).await?;
                Ok(Dispatch {
                    label: rule.label.clone(),
                    tool: Some(rule.tool.clone()),
                    outcome: Some(outcome),
                })
            }
            None => {
                tracing::debug!("no dispatch rule matched, taking the default path");
                Ok(Dispatch {
                    label: "unknown".to_string(),
                    tool: None,
                    outcome: None,
                })
            }
        }
    }
}

/// A fixed pipeline of tool names, each fed the previous payload
#[derive(Debug, Clone, Default)]
pub struct ToolChain {
    steps: Vec<String>,
}

impl ToolChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, name: impl Into<String>) -> Self {
        self.steps.push(name.into());
        self
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Run the chain, piping each payload into the next call's arguments
    ///
    /// Stops at the first failed outcome; `attempts_used` accumulates across
    /// steps either way.
    pub async fn run(&self, executor: &ToolExecutor, input: Value) -> Result<CallOutcome> {
        let mut current = input;
        let mut attempts_total = 0;

        for (index, name) in self.steps.iter().enumerate() {
            let outcome = executor.call(name, current).await?;
            attempts_total += outcome.attempts_used;
            if !outcome.succeeded {
                let step_error = outcome
                    .error
                    .map(|error| format!("step {} ({name}): {error}", index + 1))
                    .unwrap_or_else(|| format!("step {} ({name}) failed", index + 1));
                return Ok(CallOutcome::failure(step_error, attempts_total));
            }
            current = outcome.payload.unwrap_or(Value::Null);
        }

        Ok(CallOutcome::success(current, attempts_total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::demo_registry;
    use serde_json::json;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let executor = ToolExecutor::new(demo_registry());
        assert_eq!(executor.delay_for(0), Duration::from_secs(1));
        assert_eq!(executor.delay_for(1), Duration::from_secs(2));
        assert_eq!(executor.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_builders_clamp_attempts() {
        let executor = ToolExecutor::new(demo_registry())
            .with_max_attempts(0)
            .with_base_delay(Duration::from_millis(10));
        assert_eq!(executor.max_attempts, 1);
        assert_eq!(executor.base_delay, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_first_try_success_uses_one_attempt() {
        let executor = ToolExecutor::new(demo_registry());
        let outcome = executor
            .call("weather_lookup", json!({"city": "tokyo"}))
            .await
            .unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts_used, 1);
        assert_eq!(outcome.payload.unwrap()["conditions"], "clear");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let executor = ToolExecutor::new(demo_registry());
        assert!(executor.call("no_such_tool", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_chain_passes_input_through() {
        let executor = ToolExecutor::new(demo_registry());
        let outcome = ToolChain::new()
            .run(&executor, json!({"city": "tokyo"}))
            .await
            .unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts_used, 0);
        assert_eq!(outcome.payload.unwrap(), json!({"city": "tokyo"}));
    }

    fn request_router() -> ToolDispatcher {
        ToolDispatcher::new()
            .rule(
                "information_query",
                ["search", "lookup", "database"],
                "database_search",
                json!({ "query": "customer" }),
            )
            .rule(
                "weather_request",
                ["weather", "forecast", "rain"],
                "weather_lookup",
                json!({ "city": "tokyo" }),
            )
            .rule(
                "email_task",
                ["email", "notify"],
                "email_send",
                json!({ "to": "user@example.com", "subject": "automated reply" }),
            )
    }

    #[test]
    fn test_classify_matches_first_rule_case_insensitively() {
        let dispatcher = request_router();
        assert_eq!(
            dispatcher.classify("SEARCH the records"),
            Some("information_query")
        );
        assert_eq!(
            dispatcher.classify("Any rain expected?"),
            Some("weather_request")
        );
        assert_eq!(dispatcher.classify("what time is it"), None);
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_matching_tool() {
        let executor = ToolExecutor::new(demo_registry());
        let dispatch = request_router()
            .dispatch(&executor, "what does the forecast say?")
            .await
            .unwrap();
        assert_eq!(dispatch.label, "weather_request");
        assert_eq!(dispatch.tool.as_deref(), Some("weather_lookup"));
        let outcome = dispatch.outcome.unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.payload.unwrap()["conditions"], "clear");
    }

    #[tokio::test]
    async fn test_dispatch_default_path_runs_no_tool() {
        let executor = ToolExecutor::new(demo_registry());
        let dispatch = request_router()
            .dispatch(&executor, "how much does the widget cost?")
            .await
            .unwrap();
        assert_eq!(dispatch.label, "unknown");
        assert!(dispatch.tool.is_none());
        assert!(dispatch.outcome.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_rule_naming_unknown_tool_is_an_error() {
        let executor = ToolExecutor::new(demo_registry());
        let dispatcher = ToolDispatcher::new().rule("broken", ["ping"], "fax_machine", json!({}));
        assert!(dispatcher.dispatch(&executor, "ping the service").await.is_err());
    }
}
