//! The chapters: one runnable walkthrough per topic
//!
//! Every chapter is a plain async function that narrates what it does on
//! stdout. They run entirely offline; scripted models and canned tools stand
//! in for live services.

use crate::config::AppConfig;
use crate::error::{CookbookError, Result};

pub mod basics;
pub mod interrupts;
pub mod memory;
pub mod models;
pub mod react;
pub mod state;
pub mod streaming;
pub mod tools;

/// Chapter names and one-line summaries, in reading order
pub const CHAPTERS: &[(&str, &str)] = &[
    ("basics", "Build a graph, compile it, run it"),
    ("state", "State merging rules and message history"),
    ("streaming", "Watch a run as a stream of events"),
    ("memory", "Threads, checkpoints and long-term storage"),
    ("models", "Provider configuration and chat requests"),
    ("tools", "Tool registries, retries and guarded calls"),
    ("interrupts", "Pause for review, edit state, resume"),
    ("react", "A small reason-and-act agent loop"),
];

/// Run one chapter by name
pub async fn run(name: &str, config: &AppConfig) -> Result<()> {
    match name {
        "basics" => basics::run(config).await,
        "state" => state::run(config).await,
        "streaming" => streaming::run(config).await,
        "memory" => memory::run(config).await,
        "models" => models::run(config).await,
        "tools" => tools::run(config).await,
        "interrupts" => interrupts::run(config).await,
        "react" => react::run(config).await,
        other => Err(CookbookError::UnknownChapter(other.to_string())),
    }
}

/// Run every chapter in reading order
pub async fn run_all(config: &AppConfig) -> Result<()> {
    for (name, _) in CHAPTERS {
        run(name, config).await?;
        println!();
    }
    Ok(())
}

pub(crate) fn heading(title: &str) {
    println!("=== {title} ===");
}

pub(crate) fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
