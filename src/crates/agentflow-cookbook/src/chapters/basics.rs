//! First steps: nodes, edges, conditional routing

use std::collections::HashMap;

use serde_json::json;

use agentflow_core::{StateGraph, END};

use crate::chapters::{heading, pretty};
use crate::config::AppConfig;
use crate::error::Result;

pub async fn run(_config: &AppConfig) -> Result<()> {
    heading("basics: build a graph, compile it, run it");

    // A linear pipeline. Each node sees the full state and returns a partial
    // update that is shallow-merged back in.
    let pipeline = StateGraph::new("intro_pipeline")
        .add_node("extract", |state| {
            Box::pin(async move {
                let text = state["text"].as_str().unwrap_or_default();
                Ok(json!({ "words": text.split_whitespace().count() }))
            })
        })
        .add_node("report", |state| {
            Box::pin(async move {
                let words = state["words"].as_u64().unwrap_or(0);
                Ok(json!({ "report": format!("input has {words} words") }))
            })
        })
        .set_entry("extract")
        .add_edge("extract", "report")
        .add_edge("report", END)
        .compile()?;

    let state = pipeline
        .invoke(json!({ "text": "the quick brown fox" }))
        .await?;
    println!("final state:\n{}", pretty(&state));

    // Conditional edges route on whatever the state holds by then.
    let triage = StateGraph::new("support_triage")
        .add_node("classify", |state| {
            Box::pin(async move {
                let message = state["message"]
                    .as_str()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                let category = if message.contains("invoice") || message.contains("charge") {
                    "billing"
                } else {
                    "general"
                };
                Ok(json!({ "category": category }))
            })
        })
        .add_node("billing", |_| {
            Box::pin(async move { Ok(json!({ "reply": "routing you to the billing team" })) })
        })
        .add_node("general", |_| {
            Box::pin(async move { Ok(json!({ "reply": "how can we help?" })) })
        })
        .set_entry("classify")
        .add_conditional_edge(
            "classify",
            |state| state["category"].as_str().unwrap_or("general").to_string(),
            HashMap::from([
                ("billing".to_string(), "billing".to_string()),
                ("general".to_string(), "general".to_string()),
            ]),
        )
        .add_edge("billing", END)
        .add_edge("general", END)
        .compile()?;

    for message in ["I was charged twice on one invoice", "hello there"] {
        let state = triage.invoke(json!({ "message": message })).await?;
        println!("{message:?} -> {}", state["reply"]);
    }

    // Structural mistakes are caught at compile time, not mid-run.
    let broken = StateGraph::new("broken")
        .add_node("only", |state| Box::pin(async move { Ok(state) }))
        .set_entry("missing")
        .compile();
    match broken {
        Err(err) => println!("compile rejected a bad graph: {err}"),
        Ok(_) => println!("unexpected: bad graph compiled"),
    }

    Ok(())
}
