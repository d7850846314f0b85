//! State merging rules and message history

use serde_json::json;

use agentflow_core::{add_messages, trim_messages, Message, StateGraph, END};

use crate::chapters::{heading, pretty};
use crate::config::AppConfig;
use crate::error::Result;

pub async fn run(_config: &AppConfig) -> Result<()> {
    heading("state: merging rules and message history");

    // Shallow merge: later nodes overwrite keys they touch, everything else
    // survives untouched.
    let graph = StateGraph::new("profile_builder")
        .add_node("base", |_| {
            Box::pin(async move { Ok(json!({ "name": "Ada", "visits": 1 })) })
        })
        .add_node("enrich", |state| {
            Box::pin(async move {
                let visits = state["visits"].as_i64().unwrap_or(0);
                Ok(json!({ "visits": visits + 1, "plan": "pro" }))
            })
        })
        .set_entry("base")
        .add_edge("base", "enrich")
        .add_edge("enrich", END)
        .compile()?;

    let state = graph.invoke(json!({ "source": "signup" })).await?;
    println!("merged state (note 'source' survived):\n{}", pretty(&state));

    // The add_messages reducer appends new messages, and replaces instead
    // when an incoming id matches an existing one.
    let history = vec![Message::system("You are terse."), Message::user("hi")];
    let reply = Message::assistant("helo");
    let history = add_messages(history, vec![reply.clone()]);
    println!("after append: {} messages", history.len());

    let corrected = Message {
        content: "hello".to_string(),
        ..reply
    };
    let history = add_messages(history, vec![corrected]);
    println!(
        "after replacing the typo by id: {} messages, last = {:?}",
        history.len(),
        history.last().map(|message| message.content.as_str())
    );

    // trim_messages keeps the leading system prompt plus the newest tail,
    // which is how long conversations stay under a context budget.
    let mut long = vec![Message::system("You are terse.")];
    for i in 0..10 {
        long.push(Message::user(format!("question {i}")));
    }
    let trimmed = trim_messages(&long, 4);
    println!("trimmed {} messages down to {}", long.len(), trimmed.len());

    // In messages mode the graph applies the reducer for you on the
    // `messages` key; nodes just return the messages they want appended.
    let chat = StateGraph::new("chat_log")
        .with_messages()
        .add_node("greet", |_| {
            Box::pin(async move {
                Ok(json!({ "messages": [Message::assistant("welcome back")] }))
            })
        })
        .set_entry("greet")
        .add_edge("greet", END)
        .compile()?;

    let state = chat
        .invoke(json!({ "messages": [Message::user("hi")] }))
        .await?;
    let count = state["messages"].as_array().map(Vec::len).unwrap_or(0);
    println!("messages after one turn: {count}");

    Ok(())
}
