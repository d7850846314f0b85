//! Streaming execution events
//!
//! [`CompiledGraph::stream`](crate::CompiledGraph::stream) runs the graph in a
//! background task and yields [`StreamEvent`]s as nodes execute. Which events
//! are produced depends on the requested [`StreamMode`]s; terminal events
//! ([`StreamEvent::Done`], [`StreamEvent::Interrupted`],
//! [`StreamEvent::Error`]) are always delivered.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// What to emit while the graph runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Full state after each node
    Values,
    /// Per-node partial updates
    Updates,
    /// Node lifecycle events
    Debug,
}

/// An event observed during graph execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A node is about to run (mode: [`StreamMode::Debug`])
    NodeStart { node: String },

    /// A node produced a partial update (mode: [`StreamMode::Updates`])
    Updates { node: String, update: Value },

    /// Full state after a node ran (mode: [`StreamMode::Values`])
    Values { values: Value },

    /// Execution paused before `node`; resume with another invoke
    Interrupted { node: String },

    /// Execution failed
    Error { message: String },

    /// Execution finished with the final state
    Done { values: Value },
}

impl StreamEvent {
    /// Terminal events end the stream and ignore mode filtering
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Done { .. } | StreamEvent::Interrupted { .. } | StreamEvent::Error { .. }
        )
    }
}

/// Stream of execution events
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Sender half used by the run loop; filters by the requested modes
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    modes: Vec<StreamMode>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<StreamEvent>, modes: Vec<StreamMode>) -> Self {
        Self { tx, modes }
    }

    fn wants(&self, event: &StreamEvent) -> bool {
        if event.is_terminal() {
            return true;
        }
        let mode = match event {
            StreamEvent::NodeStart { .. } => StreamMode::Debug,
            StreamEvent::Updates { .. } => StreamMode::Updates,
            StreamEvent::Values { .. } => StreamMode::Values,
            _ => return true,
        };
        self.modes.contains(&mode)
    }

    /// Emit an event; a dropped receiver is not an execution error
    pub(crate) async fn send(&self, event: StreamEvent) {
        if self.wants(&event) {
            let _ = self.tx.send(event).await;
        }
    }
}
