//! # agentflow-cookbook
//!
//! Runnable, narrated chapters for the agentflow stack: building graphs,
//! managing state and streams, selecting storage per environment,
//! configuring model providers, and invoking tools resiliently.
//!
//! Everything runs offline. Scripted models and canned tools stand in for
//! live services, so `cookbook all` works on a fresh checkout with no
//! credentials.
//!
//! ```no_run
//! use agentflow_cookbook::chapters;
//! use agentflow_cookbook::config::AppConfig;
//!
//! # async fn demo() -> agentflow_cookbook::Result<()> {
//! let config = AppConfig::from_env()?;
//! chapters::run("basics", &config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The pieces the chapters build on are exported for reuse:
//! [`StorageManager`] for environment-driven backend selection,
//! [`ToolExecutor`] for retried tool invocation, and the demo tools.

pub mod chapters;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod logging;
pub mod storage;
pub mod tools;

pub use config::{AppConfig, DebugConfig, WorkflowConfig};
pub use error::{CookbookError, Result};
pub use executor::{CallOutcome, Dispatch, ToolChain, ToolDispatcher, ToolExecutor};
pub use logging::init_logging;
pub use storage::{
    Environment, FallbackEvent, StorageConfig, StorageHandle, StorageManager, StorageStatus,
    StorageType,
};
pub use tools::{
    demo_registry, DatabaseSearchTool, EmailTool, FlakyTool, GuardedTool, WeatherTool,
};
