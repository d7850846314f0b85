//! Minimal three-node pipeline: validate input, process it, summarize.
//!
//! Run with: cargo run -p agentflow-core --example simple_graph

use agentflow_core::{Result, StateGraph, END};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    let graph = StateGraph::new("pipeline")
        .add_node("validate", |state| {
            Box::pin(async move {
                let text = state["text"].as_str().unwrap_or("").to_string();
                Ok(json!({ "valid": !text.trim().is_empty() }))
            })
        })
        .add_node("process", |state| {
            Box::pin(async move {
                let text = state["text"].as_str().unwrap_or("").to_string();
                Ok(json!({ "words": text.split_whitespace().count() }))
            })
        })
        .add_node("summarize", |state| {
            Box::pin(async move {
                let words = state["words"].as_u64().unwrap_or(0);
                Ok(json!({ "summary": format!("input has {words} words") }))
            })
        })
        .set_entry("validate")
        .add_edge("validate", "process")
        .add_edge("process", "summarize")
        .add_edge("summarize", END)
        .compile()?;

    println!("=== simple graph ===\n");

    let result = graph
        .invoke(json!({ "text": "the quick brown fox" }))
        .await?;

    println!("final state: {}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
