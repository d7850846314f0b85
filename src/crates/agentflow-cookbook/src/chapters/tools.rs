//! Tool registries, retries and guarded calls

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use agentflow_core::{with_retry, RetryPolicy, Tool};

use crate::chapters::heading;
use crate::config::AppConfig;
use crate::error::Result;
use crate::executor::{ToolChain, ToolDispatcher, ToolExecutor};
use crate::tools::{demo_registry, FlakyTool, GuardedTool, WeatherTool};

pub async fn run(_config: &AppConfig) -> Result<()> {
    heading("tools: registries, retries and guarded calls");

    let mut registry = demo_registry();
    registry.register(Arc::new(FlakyTool::failing_first("unstable_api", 2)));
    registry.register(Arc::new(FlakyTool::failing_first("always_down", 99)));

    println!("available tools:");
    for spec in registry.specs() {
        println!("  {} - {}", spec.name, spec.description);
    }

    // A short base delay keeps the demo snappy; the default is one second.
    let executor = ToolExecutor::new(registry).with_base_delay(Duration::from_millis(50));

    let outcome = executor
        .call("database_search", json!({ "query": "widget" }))
        .await?;
    println!(
        "search: succeeded={} attempts={} matches={}",
        outcome.succeeded,
        outcome.attempts_used,
        outcome
            .payload
            .as_ref()
            .map(|payload| payload["count"].clone())
            .unwrap_or(Value::Null)
    );

    // unstable_api fails twice before recovering; the executor waits
    // base, then 2x base, and reports how many attempts it spent.
    let outcome = executor.call("unstable_api", json!({})).await?;
    println!(
        "flaky tool recovered: succeeded={} attempts={}",
        outcome.succeeded, outcome.attempts_used
    );

    // When every attempt fails, the failure is data, not an error.
    let outcome = executor.call("always_down", json!({})).await?;
    println!(
        "exhausted: succeeded={} attempts={} error={:?}",
        outcome.succeeded, outcome.attempts_used, outcome.error
    );

    // Only an unregistered name is treated as a programmer error.
    if let Err(err) = executor.call("fax_machine", json!({})).await {
        println!("unknown tool is refused outright: {err}");
    }

    // Parallel calls keep input order in their outcomes.
    let cities: Vec<(String, Value)> = ["london", "tokyo", "sydney"]
        .iter()
        .map(|city| ("weather_lookup".to_string(), json!({ "city": city })))
        .collect();
    let outcomes = executor.call_parallel(&cities).await?;
    for ((_, arguments), outcome) in cities.iter().zip(&outcomes) {
        let conditions = outcome
            .payload
            .as_ref()
            .map(|payload| payload["conditions"].clone())
            .unwrap_or(Value::Null);
        println!("  {} -> {}", arguments["city"], conditions);
    }

    // Sequential execution halts at the first failed outcome.
    let steps = vec![
        ("weather_lookup".to_string(), json!({ "city": "tokyo" })),
        ("always_down".to_string(), json!({})),
        (
            "email_send".to_string(),
            json!({ "to": "ops@example.com", "subject": "never sent" }),
        ),
    ];
    let outcomes = executor.call_sequential(&steps).await?;
    println!(
        "sequential: ran {} of {} steps before halting",
        outcomes.len(),
        steps.len()
    );

    // Keyword rules route a request to one tool; unmatched input takes the
    // default path and never touches the registry.
    let dispatcher = ToolDispatcher::new()
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
        );
    println!("conditional dispatch:");
    for request in [
        "search the customer database",
        "will it rain tomorrow?",
        "notify ops by email",
        "how much does the widget cost?",
    ] {
        let dispatch = dispatcher.dispatch(&executor, request).await?;
        match (&dispatch.tool, &dispatch.outcome) {
            (Some(tool), Some(outcome)) => println!(
                "  {request:?} -> {} via {tool} (succeeded={})",
                dispatch.label, outcome.succeeded
            ),
            _ => println!(
                "  {request:?} -> {}: answered without a tool",
                dispatch.label
            ),
        }
    }

    // A chain pipes each payload into the next call's arguments.
    let chain = ToolChain::new().then("weather_lookup");
    let outcome = chain.run(&executor, json!({ "city": "sydney" })).await?;
    println!("chain payload: {:?}", outcome.payload);

    // Permissions wrap a tool without changing its shape.
    let guarded = GuardedTool::new(Arc::new(WeatherTool), "weather.read");
    if let Err(err) = guarded.call(json!({ "city": "london" })).await {
        println!("guarded call refused: {err}");
    }
    let granted = GuardedTool::new(Arc::new(WeatherTool), "weather.read").grant("weather.read");
    let report = granted.call(json!({ "city": "london" })).await?;
    println!("after granting: {report}");

    // For arbitrary async work there is the lower-level retry helper, with
    // jittered exponential backoff controlled by a policy.
    let attempts = AtomicUsize::new(0);
    let policy = RetryPolicy::new(3)
        .with_initial_interval(0.05)
        .with_jitter(false);
    let result = with_retry(&policy, || {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 3 {
                Err(format!("transient glitch {n}"))
            } else {
                Ok("stable value")
            }
        }
    })
    .await;
    println!(
        "with_retry: {result:?} after {} attempts",
        attempts.load(Ordering::SeqCst)
    );

    Ok(())
}
