//! Threads, checkpoints and long-term storage

use serde_json::json;

use agentflow_checkpoint::ThreadConfig;
use agentflow_core::{trim_messages, Message, StateGraph, END};

use crate::chapters::{heading, pretty};
use crate::config::AppConfig;
use crate::error::Result;
use crate::storage::{Environment, StorageConfig, StorageManager};

pub async fn run(_config: &AppConfig) -> Result<()> {
    heading("memory: threads, checkpoints and long-term storage");

    // Storage selection honors MEMORY_STORAGE_TYPE and friends; whatever it
    // ends up with, both handles are usable.
    let storage =
        StorageManager::initialize(StorageConfig::from_env(Environment::Development)).await;
    println!(
        "storage status:\n{}",
        pretty(&serde_json::to_value(storage.status())?)
    );

    let graph = StateGraph::new("visit_counter")
        .add_node("count", |state| {
            Box::pin(async move {
                let visits = state["visits"].as_i64().unwrap_or(0);
                Ok(json!({ "visits": visits + 1 }))
            })
        })
        .set_entry("count")
        .add_edge("count", END)
        .compile()?
        .with_checkpointer(storage.short_term())
        .with_store(storage.long_term());

    // Each thread id is an isolated conversation; invoking again on the same
    // thread continues from its latest checkpoint.
    let alice = ThreadConfig::new("alice");
    let bob = ThreadConfig::new("bob");

    for _ in 0..3 {
        graph
            .invoke_with_config(json!({}), Some(alice.clone()))
            .await?;
    }
    graph
        .invoke_with_config(json!({}), Some(bob.clone()))
        .await?;

    if let Some(snapshot) = graph.get_state(&alice).await? {
        println!("alice visits: {}", snapshot.values["visits"]);
    }
    if let Some(snapshot) = graph.get_state(&bob).await? {
        println!("bob visits: {} (threads do not share state)", snapshot.values["visits"]);
    }

    // Full history per thread, newest first.
    println!("alice's latest checkpoints:");
    for snapshot in graph.get_state_history(&alice, Some(3)).await? {
        println!(
            "  step {} ({:?}): {}",
            snapshot.step, snapshot.source, snapshot.values
        );
    }

    // The long-term store is keyed by namespace + key and is shared across
    // threads and graphs: a preference saved in one session is there for the
    // next one.
    let store = storage.long_term();
    store
        .put(
            &["user_preferences", "alice"],
            "preference",
            json!({ "tone": "formal", "language": "en" }),
        )
        .await?;
    if let Some(preference) = store.get(&["user_preferences", "alice"], "preference").await? {
        println!("recalled preference: {preference}");
    }

    // One common way to organize long-term memory is by what kind of thing it
    // remembers: semantic (facts about the user), episodic (specific
    // interactions), procedural (approaches that worked).
    let user = "alice";
    store
        .put(
            &["semantic", user],
            "user_profile",
            json!({
                "occupation": "software engineer",
                "communication_style": "concise",
            }),
        )
        .await?;
    store
        .put(
            &["episodic", user],
            &uuid::Uuid::new_v4().to_string(),
            json!({
                "context": "asked about project status",
                "action": "gave a step-by-step progress report",
                "outcome": "satisfied",
            }),
        )
        .await?;
    store
        .put(
            &["procedural", user],
            &uuid::Uuid::new_v4().to_string(),
            json!({
                "situation": "technical question",
                "approach": "confirm the scenario first, then answer in steps",
            }),
        )
        .await?;

    if let Some(profile) = store.get(&["semantic", user], "user_profile").await? {
        println!("semantic memory: {profile}");
    }
    println!(
        "episodic memories: {}",
        store.list(&["episodic", user]).await?.len()
    );
    println!(
        "procedural memories: {}",
        store.list(&["procedural", user]).await?.len()
    );

    // Neither store enforces expiry on its own, so retention is a policy the
    // application applies: cap the live conversation, sweep old namespaces.
    let retention_policy = json!({
        "short_term": { "max_messages": 6, "ttl_days": 7 },
        "long_term": {
            "user_preferences": { "ttl_days": 365 },
            "episodic": { "ttl_days": 30 },
            "procedural": { "ttl_days": 90 },
        },
    });
    println!("retention policy:\n{}", pretty(&retention_policy));

    // Enforcing the short-term cap is a trim: keep the system prompt plus the
    // most recent messages.
    let mut conversation = vec![Message::system("you are a terse assistant")];
    for i in 0..12 {
        conversation.push(Message::user(format!("question {i}")));
    }
    let max_messages = retention_policy["short_term"]["max_messages"]
        .as_u64()
        .unwrap_or(6) as usize;
    let trimmed = trim_messages(&conversation, max_messages);
    println!(
        "trimmed conversation: {} -> {} messages (system prompt kept)",
        conversation.len(),
        trimmed.len()
    );

    storage.close().await;
    Ok(())
}
