//! Watching a run as a stream of events

use futures::StreamExt;
use serde_json::json;

use agentflow_core::{StateGraph, StreamEvent, StreamMode, END};

use crate::chapters::heading;
use crate::config::AppConfig;
use crate::error::Result;

fn pipeline() -> Result<agentflow_core::CompiledGraph> {
    let graph = StateGraph::new("etl")
        .add_node("fetch", |_| {
            Box::pin(async move { Ok(json!({ "rows": 3 })) })
        })
        .add_node("clean", |state| {
            Box::pin(async move {
                let rows = state["rows"].as_i64().unwrap_or(0);
                Ok(json!({ "rows": rows - 1, "dropped": 1 }))
            })
        })
        .add_node("load", |_| {
            Box::pin(async move { Ok(json!({ "loaded": true })) })
        })
        .set_entry("fetch")
        .add_edge("fetch", "clean")
        .add_edge("clean", "load")
        .add_edge("load", END)
        .compile()?;
    Ok(graph)
}

pub async fn run(_config: &AppConfig) -> Result<()> {
    heading("streaming: watch a run as it happens");

    // Updates mode reports each node's partial update as it lands. The
    // terminal Done event always arrives, whatever modes are selected.
    println!("-- updates --");
    let graph = pipeline()?;
    let mut events = graph.stream(json!({}), None, &[StreamMode::Updates]);
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Updates { node, update } => println!("[{node}] {update}"),
            StreamEvent::Done { values } => println!("done: {values}"),
            other => println!("{other:?}"),
        }
    }

    // Values mode snapshots the whole state after every node; debug mode adds
    // node lifecycle events. Events serialize with an `event` tag, which is
    // what a server would forward to its clients.
    println!("-- values + debug, as wire json --");
    let mut events = graph.stream(
        json!({}),
        None,
        &[StreamMode::Values, StreamMode::Debug],
    );
    while let Some(event) = events.next().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(_) => println!("{event:?}"),
        }
    }

    Ok(())
}
