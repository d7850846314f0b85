//! Application configuration
//!
//! [`AppConfig`] is assembled once in `main` and passed to chapters by
//! reference; nothing here is global or mutable in place. Adjustments go
//! through the consuming `with_*` builders.

use std::time::Duration;

use agentflow_llm::{LlmConfig, LlmProvider};

use crate::env::{get_env_bool, get_env_parse};
use crate::error::Result;

/// Knobs for workflow execution
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// Bound on agent-loop iterations (`MAX_ITERATIONS`)
    pub max_iterations: usize,

    /// Default budget for long-running operations (`DEFAULT_TIMEOUT`, seconds)
    pub default_timeout: Duration,

    /// Whether interactive chapters wait for a human (`ENABLE_HUMAN_FEEDBACK`)
    pub enable_human_feedback: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            default_timeout: Duration::from_secs(300),
            enable_human_feedback: true,
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_iterations: get_env_parse("MAX_ITERATIONS", defaults.max_iterations),
            default_timeout: Duration::from_secs(get_env_parse(
                "DEFAULT_TIMEOUT",
                defaults.default_timeout.as_secs(),
            )),
            enable_human_feedback: get_env_bool(
                "ENABLE_HUMAN_FEEDBACK",
                defaults.enable_human_feedback,
            ),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_human_feedback(mut self, enabled: bool) -> Self {
        self.enable_human_feedback = enabled;
        self
    }
}

/// Development and debugging switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugConfig {
    /// Extra chapter output (`DEBUG_MODE`)
    pub debug_mode: bool,

    /// Print graph structure before running (`SHOW_GRAPH_VISUALIZATION`)
    pub show_graph_visualization: bool,

    /// Print state after every node (`SAVE_INTERMEDIATE_STATES`)
    pub save_intermediate_states: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            show_graph_visualization: true,
            save_intermediate_states: true,
        }
    }
}

impl DebugConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            debug_mode: get_env_bool("DEBUG_MODE", defaults.debug_mode),
            show_graph_visualization: get_env_bool(
                "SHOW_GRAPH_VISUALIZATION",
                defaults.show_graph_visualization,
            ),
            save_intermediate_states: get_env_bool(
                "SAVE_INTERMEDIATE_STATES",
                defaults.save_intermediate_states,
            ),
        }
    }
}

/// Everything a chapter needs, built once and passed by reference
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub workflow: WorkflowConfig,
    pub debug: DebugConfig,
}

impl Default for AppConfig {
    /// Built-in defaults, with no environment reads
    fn default() -> Self {
        Self {
            llm: LlmConfig::new(LlmProvider::default()),
            workflow: WorkflowConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from the environment
    ///
    /// The llm section is resolved but deliberately not validated here; the
    /// models chapter demonstrates validation, and offline chapters never
    /// need credentials.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            llm: LlmConfig::resolve()?,
            workflow: WorkflowConfig::from_env(),
            debug: DebugConfig::from_env(),
        })
    }

    pub fn with_workflow(mut self, workflow: WorkflowConfig) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_workflow_defaults() {
        let _guard = lock_env();
        for var in ["MAX_ITERATIONS", "DEFAULT_TIMEOUT", "ENABLE_HUMAN_FEEDBACK"] {
            std::env::remove_var(var);
        }

        let workflow = WorkflowConfig::from_env();
        assert_eq!(workflow.max_iterations, 10);
        assert_eq!(workflow.default_timeout, Duration::from_secs(300));
        assert!(workflow.enable_human_feedback);
    }

    #[test]
    fn test_workflow_env_overrides() {
        let _guard = lock_env();
        std::env::set_var("MAX_ITERATIONS", "3");
        std::env::set_var("DEFAULT_TIMEOUT", "60");
        std::env::set_var("ENABLE_HUMAN_FEEDBACK", "false");

        let workflow = WorkflowConfig::from_env();
        assert_eq!(workflow.max_iterations, 3);
        assert_eq!(workflow.default_timeout, Duration::from_secs(60));
        assert!(!workflow.enable_human_feedback);

        for var in ["MAX_ITERATIONS", "DEFAULT_TIMEOUT", "ENABLE_HUMAN_FEEDBACK"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_workflow_builders() {
        let workflow = WorkflowConfig::default()
            .with_max_iterations(5)
            .with_default_timeout(Duration::from_secs(30))
            .with_human_feedback(false);
        assert_eq!(workflow.max_iterations, 5);
        assert_eq!(workflow.default_timeout, Duration::from_secs(30));
        assert!(!workflow.enable_human_feedback);
    }

    #[test]
    fn test_debug_defaults() {
        let _guard = lock_env();
        for var in ["DEBUG_MODE", "SHOW_GRAPH_VISUALIZATION", "SAVE_INTERMEDIATE_STATES"] {
            std::env::remove_var(var);
        }

        let debug = DebugConfig::from_env();
        assert!(!debug.debug_mode);
        assert!(debug.show_graph_visualization);
        assert!(debug.save_intermediate_states);
        assert_eq!(debug, DebugConfig::default());
    }
}
