//! Human-in-the-loop: pause, inspect, edit, resume

use std::sync::Arc;

use serde_json::{json, Value};

use agentflow_checkpoint::{InMemorySaver, ThreadConfig};
use agentflow_core::{GraphError, StateGraph, END};

use crate::chapters::heading;
use crate::config::AppConfig;
use crate::error::Result;

pub async fn run(_config: &AppConfig) -> Result<()> {
    heading("interrupts: pause for review, edit state, resume");

    // interrupt_before pauses the run just before the named node. A
    // checkpointer is required; the pause is a persisted state like any
    // other.
    let graph = StateGraph::new("publisher")
        .add_node("draft", |state| {
            Box::pin(async move {
                let topic = state["topic"].as_str().unwrap_or("something");
                Ok(json!({ "draft": format!("An article about {topic}.") }))
            })
        })
        .add_node("publish", |state| {
            Box::pin(async move {
                let draft = state["draft"].as_str().unwrap_or_default().to_string();
                Ok(json!({ "published": draft }))
            })
        })
        .set_entry("draft")
        .add_edge("draft", "publish")
        .add_edge("publish", END)
        .compile()?
        .with_checkpointer(Arc::new(InMemorySaver::new()))
        .with_interrupt_before(["publish"]);

    let thread = ThreadConfig::new("review-42");

    match graph
        .invoke_with_config(json!({ "topic": "rust" }), Some(thread.clone()))
        .await
    {
        Err(GraphError::Interrupted { node }) => println!("paused before node '{node}'"),
        Ok(_) => println!("unexpected: ran to completion"),
        Err(err) => return Err(err.into()),
    }

    if let Some(snapshot) = graph.get_state(&thread).await? {
        println!("waiting at: {:?}", snapshot.next);
        println!("draft under review: {}", snapshot.values["draft"]);
    }

    // A reviewer edits the paused state; the pending interrupt survives the
    // edit.
    graph
        .update_state(
            &thread,
            json!({ "draft": "An article about rust, reviewed and approved." }),
        )
        .await?;

    // Null input resumes from the paused node without changing anything
    // else.
    let final_state = graph
        .invoke_with_config(Value::Null, Some(thread.clone()))
        .await?;
    println!("published: {}", final_state["published"]);

    Ok(())
}
