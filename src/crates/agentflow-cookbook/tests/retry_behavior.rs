//! Retry and backoff behavior of the tool executor

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use agentflow_core::ToolRegistry;
use agentflow_cookbook::executor::ToolExecutor;
use agentflow_cookbook::tools::FlakyTool;

fn registry_with(tools: Vec<Arc<FlakyTool>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

#[tokio::test(start_paused = true)]
async fn test_success_on_third_attempt_reports_three_attempts() {
    let flaky = Arc::new(FlakyTool::failing_first("unstable", 2));
    let executor = ToolExecutor::new(registry_with(vec![flaky.clone()]));

    let started = tokio::time::Instant::now();
    let outcome = executor.call("unstable", json!({})).await.unwrap();

    assert!(outcome.succeeded);
    assert_eq!(outcome.attempts_used, 3);
    assert_eq!(flaky.calls(), 3);
    // Backoff slept 1s after the first failure and 2s after the second.
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_is_an_outcome_not_an_error() {
    let flaky = Arc::new(FlakyTool::failing_first("down", 99));
    let executor = ToolExecutor::new(registry_with(vec![flaky.clone()]));

    let outcome = executor.call("down", json!({})).await.unwrap();

    assert!(!outcome.succeeded);
    assert!(outcome.payload.is_none());
    assert_eq!(outcome.attempts_used, 3);
    assert!(outcome.error.unwrap().contains("transient failure"));
    assert_eq!(flaky.calls(), 3);
}

#[tokio::test]
async fn test_unknown_tool_raises_instead_of_reporting() {
    let executor = ToolExecutor::new(ToolRegistry::new());
    assert!(executor.call("ghost", json!({})).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_attempt_ceiling_is_configurable() {
    let flaky = Arc::new(FlakyTool::failing_first("slow_recover", 4));
    let executor =
        ToolExecutor::new(registry_with(vec![flaky.clone()])).with_max_attempts(5);

    let outcome = executor.call("slow_recover", json!({})).await.unwrap();

    assert!(outcome.succeeded);
    assert_eq!(outcome.attempts_used, 5);
    assert_eq!(flaky.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_sequential_halts_where_parallel_continues() {
    let ok_tool = Arc::new(FlakyTool::failing_first("ok_tool", 0));
    let bad_tool = Arc::new(FlakyTool::failing_first("bad_tool", 99));
    let executor = ToolExecutor::new(registry_with(vec![ok_tool, bad_tool]))
        .with_base_delay(Duration::from_millis(10));

    let calls = vec![
        ("ok_tool".to_string(), json!({})),
        ("bad_tool".to_string(), json!({})),
        ("ok_tool".to_string(), json!({})),
    ];

    let sequential = executor.call_sequential(&calls).await.unwrap();
    assert_eq!(sequential.len(), 2);
    assert!(sequential[0].succeeded);
    assert!(!sequential[1].succeeded);

    let parallel = executor.call_parallel(&calls).await.unwrap();
    assert_eq!(parallel.len(), 3);
    assert!(parallel[0].succeeded);
    assert!(!parallel[1].succeeded);
    assert!(parallel[2].succeeded);
}

#[tokio::test]
async fn test_parallel_rejects_unknown_names_before_running_anything() {
    let probe = Arc::new(FlakyTool::failing_first("probe", 0));
    let executor = ToolExecutor::new(registry_with(vec![probe.clone()]));

    let calls = vec![
        ("probe".to_string(), json!({})),
        ("ghost".to_string(), json!({})),
    ];

    assert!(executor.call_parallel(&calls).await.is_err());
    assert_eq!(probe.calls(), 0);
}
