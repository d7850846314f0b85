//! Compiled graph execution
//!
//! [`CompiledGraph`] is the runnable form of a [`StateGraph`](crate::StateGraph).
//! Execution starts at the entry edge and follows one edge per step, shallow
//! merging each node's partial update into the state, until the walk reaches
//! [`END`] or the recursion limit trips.
//!
//! With a checkpointer attached and a [`ThreadConfig`] supplied, every step is
//! persisted: a later invoke on the same thread starts from the saved state
//! (merging the new input in), which is what makes multi-turn conversations
//! and pause/resume work.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use agentflow_checkpoint::{
    Checkpoint, CheckpointMetadata, CheckpointSource, CheckpointTuple, Checkpointer, Store,
    ThreadConfig,
};

use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeId, END, START};
use crate::messages::{add_messages, Message};
use crate::stream::{EventSink, EventStream, StreamEvent, StreamMode};

/// Default bound on node executions per invoke
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Shallow-merge a partial update into the state
///
/// `Null` updates leave the state untouched; non-object updates replace it
/// wholesale. With `messages_mode`, the `messages` key is combined with the
/// [`add_messages`] reducer instead of being overwritten.
pub(crate) fn merge_state(base: Value, update: Value, messages_mode: bool) -> Result<Value> {
    let update_map = match update {
        Value::Object(map) => map,
        Value::Null => return Ok(base),
        other => return Ok(other),
    };

    let mut base_map = match base {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    for (key, value) in update_map {
        if messages_mode && key == "messages" {
            let existing = base_map.remove("messages").unwrap_or(Value::Array(Vec::new()));
            let left: Vec<Message> = serde_json::from_value(existing).unwrap_or_default();
            let right: Vec<Message> = serde_json::from_value(value).unwrap_or_default();
            base_map.insert(key, serde_json::to_value(add_messages(left, right))?);
        } else {
            base_map.insert(key, value);
        }
    }

    Ok(Value::Object(base_map))
}

/// A point-in-time view of a thread's persisted state
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    /// State values at this checkpoint
    pub values: Value,

    /// Node that will run next if the thread is resumed here
    pub next: Option<String>,

    /// Config addressing exactly this checkpoint
    pub config: ThreadConfig,

    pub created_at: DateTime<Utc>,

    pub source: CheckpointSource,

    pub step: i64,
}

impl From<CheckpointTuple> for StateSnapshot {
    fn from(tuple: CheckpointTuple) -> Self {
        let config = ThreadConfig::new(&tuple.config.thread_id)
            .with_checkpoint_id(&tuple.checkpoint.id);
        Self {
            values: tuple.checkpoint.values,
            next: tuple.checkpoint.next,
            config,
            created_at: tuple.checkpoint.ts,
            source: tuple.metadata.source,
            step: tuple.metadata.step,
        }
    }
}

/// A validated, runnable graph
#[derive(Clone)]
pub struct CompiledGraph {
    name: String,
    graph: Arc<Graph>,
    messages_mode: bool,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    store: Option<Arc<dyn Store>>,
    interrupt_before: Vec<NodeId>,
    recursion_limit: usize,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("name", &self.name)
            .field("nodes", &self.graph.nodes.len())
            .field("messages_mode", &self.messages_mode)
            .field("checkpointer", &self.checkpointer.is_some())
            .field("store", &self.store.is_some())
            .field("interrupt_before", &self.interrupt_before)
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

impl CompiledGraph {
    pub(crate) fn new(name: String, graph: Graph, messages_mode: bool) -> Self {
        Self {
            name,
            graph: Arc::new(graph),
            messages_mode,
            checkpointer: None,
            store: None,
            interrupt_before: Vec::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a checkpointer; required for threads, interrupts and history
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Attach a long-term store, available to nodes via [`store`](Self::store)
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Pause execution before each of the named nodes
    pub fn with_interrupt_before<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interrupt_before = nodes.into_iter().map(Into::into).collect();
        self
    }

    /// Override the per-invoke bound on node executions
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit.max(1);
        self
    }

    pub fn store(&self) -> Option<Arc<dyn Store>> {
        self.store.clone()
    }

    pub fn checkpointer(&self) -> Option<Arc<dyn Checkpointer>> {
        self.checkpointer.clone()
    }

    /// Run the graph to completion without persistence
    pub async fn invoke(&self, input: Value) -> Result<Value> {
        self.invoke_with_config(input, None).await
    }

    /// Run the graph, persisting per-step checkpoints when both a
    /// checkpointer and a thread config are present
    ///
    /// If the thread was paused by an interrupt, this resumes it; pass
    /// `Value::Null` to resume without changing the state. Returns
    /// [`GraphError::Interrupted`] when execution pauses before a node listed
    /// in `interrupt_before`.
    #[tracing::instrument(skip(self, input, config), fields(graph = %self.name))]
    pub async fn invoke_with_config(
        &self,
        input: Value,
        config: Option<ThreadConfig>,
    ) -> Result<Value> {
        self.run_inner(input, config, None).await
    }

    /// Run the graph in a background task, yielding events as it goes
    ///
    /// Events are filtered by `modes`; terminal events are always delivered
    /// and the stream ends after one of them.
    pub fn stream(
        &self,
        input: Value,
        config: Option<ThreadConfig>,
        modes: &[StreamMode],
    ) -> EventStream {
        let (tx, rx) = mpsc::channel(64);
        let sink = EventSink::new(tx, modes.to_vec());
        let graph = self.clone();

        tokio::spawn(async move {
            let outcome = graph.run_inner(input, config, Some(&sink)).await;
            let terminal = match outcome {
                Ok(values) => StreamEvent::Done { values },
                Err(GraphError::Interrupted { node }) => StreamEvent::Interrupted { node },
                Err(err) => StreamEvent::Error {
                    message: err.to_string(),
                },
            };
            sink.send(terminal).await;
        });

        Box::pin(ReceiverStream::new(rx))
    }

    /// Latest persisted snapshot for a thread, or the one a pinned
    /// `checkpoint_id` addresses
    pub async fn get_state(&self, config: &ThreadConfig) -> Result<Option<StateSnapshot>> {
        let checkpointer = self.require_checkpointer()?;
        let tuple = checkpointer.get_tuple(config).await?;
        Ok(tuple.map(StateSnapshot::from))
    }

    /// Persisted snapshots for a thread, newest first
    pub async fn get_state_history(
        &self,
        config: &ThreadConfig,
        limit: Option<usize>,
    ) -> Result<Vec<StateSnapshot>> {
        let checkpointer = self.require_checkpointer()?;
        let tuples = checkpointer.list(config, limit).await?;
        Ok(tuples.into_iter().map(StateSnapshot::from).collect())
    }

    /// Merge `update` into the thread's latest state and persist the result
    ///
    /// A pending interrupt survives the edit: resuming afterwards continues
    /// from the same node, with the edited values.
    pub async fn update_state(&self, config: &ThreadConfig, update: Value) -> Result<ThreadConfig> {
        let checkpointer = self.require_checkpointer()?;

        let (values, next, step) = match checkpointer.get_tuple(config).await? {
            Some(tuple) => (
                tuple.checkpoint.values,
                tuple.checkpoint.next,
                tuple.metadata.step + 1,
            ),
            None => (Value::Object(serde_json::Map::new()), None, 0),
        };

        let merged = merge_state(values, update, self.messages_mode)?;
        let mut checkpoint = Checkpoint::new(merged);
        if let Some(node) = next {
            checkpoint = checkpoint.with_next(node);
        }

        let thread = ThreadConfig::new(&config.thread_id);
        Ok(checkpointer
            .put(
                &thread,
                checkpoint,
                CheckpointMetadata::new(CheckpointSource::Update, step),
            )
            .await?)
    }

    fn require_checkpointer(&self) -> Result<&Arc<dyn Checkpointer>> {
        self.checkpointer.as_ref().ok_or_else(|| {
            GraphError::Validation(
                "no checkpointer attached; add one with with_checkpointer".to_string(),
            )
        })
    }

    /// Resolve the node that follows `from` given the current state
    fn next_node(&self, from: &str, state: &Value) -> Result<NodeId> {
        match self.graph.edge(from) {
            Some(Edge::Direct(target)) => Ok(target.clone()),
            Some(Edge::Conditional { router, branches }) => {
                let label = router(state);
                if let Some(target) = branches.get(&label) {
                    Ok(target.clone())
                } else if label == END {
                    Ok(END.to_string())
                } else {
                    Err(GraphError::Validation(format!(
                        "conditional edge from '{from}' routed to unknown branch '{label}'"
                    )))
                }
            }
            None => Err(GraphError::Validation(format!(
                "node '{from}' has no outgoing edge"
            ))),
        }
    }

    async fn run_inner(
        &self,
        input: Value,
        config: Option<ThreadConfig>,
        sink: Option<&EventSink>,
    ) -> Result<Value> {
        let persistence = match (&self.checkpointer, &config) {
            (Some(checkpointer), Some(config)) => {
                Some((checkpointer.clone(), ThreadConfig::new(&config.thread_id)))
            }
            _ => None,
        };

        // Load the thread's saved state, if any, and merge the input over it.
        let mut state = input;
        let mut resume_from: Option<String> = None;
        let mut step: i64 = 0;
        if let (Some(checkpointer), Some(config)) = (&self.checkpointer, &config) {
            if let Some(tuple) = checkpointer.get_tuple(config).await? {
                state = merge_state(tuple.checkpoint.values, state, self.messages_mode)?;
                resume_from = tuple.checkpoint.next;
                step = tuple.metadata.step + 1;
            }
        }

        // An interrupt pauses *before* a node; when resuming at that node the
        // gate must let it through exactly once.
        let mut disarmed: Option<String> = None;
        let mut current = match resume_from {
            Some(node) if self.graph.node(&node).is_some() => {
                tracing::debug!(node = %node, "resuming paused thread");
                disarmed = Some(node.clone());
                node
            }
            _ => {
                let entry = self.next_node(START, &state)?;
                if let Some((checkpointer, thread)) = &persistence {
                    let checkpoint = Checkpoint::new(state.clone()).with_next(&entry);
                    checkpointer
                        .put(
                            thread,
                            checkpoint,
                            CheckpointMetadata::new(CheckpointSource::Input, step),
                        )
                        .await?;
                    step += 1;
                }
                entry
            }
        };

        let mut executed = 0usize;
        while current != END {
            if executed >= self.recursion_limit {
                return Err(GraphError::RecursionLimit(self.recursion_limit));
            }

            if self.interrupt_before.contains(&current) {
                if disarmed.as_deref() == Some(current.as_str()) {
                    disarmed = None;
                } else {
                    tracing::info!(node = %current, "pausing before node");
                    return Err(GraphError::Interrupted { node: current });
                }
            }

            let node = self
                .graph
                .node(&current)
                .ok_or_else(|| GraphError::UnknownNode(current.clone()))?;

            if let Some(sink) = sink {
                sink.send(StreamEvent::NodeStart {
                    node: current.clone(),
                })
                .await;
            }
            tracing::debug!(node = %current, "executing node");

            let update = (node.executor)(state.clone()).await.map_err(|err| match err {
                err @ (GraphError::Interrupted { .. } | GraphError::NodeExecution { .. }) => err,
                other => GraphError::node_execution(&current, other.to_string()),
            })?;

            state = merge_state(state, update.clone(), self.messages_mode)?;
            executed += 1;

            if let Some(sink) = sink {
                sink.send(StreamEvent::Updates {
                    node: current.clone(),
                    update,
                })
                .await;
                sink.send(StreamEvent::Values {
                    values: state.clone(),
                })
                .await;
            }

            let next = self.next_node(&current, &state)?;

            if let Some((checkpointer, thread)) = &persistence {
                let mut checkpoint = Checkpoint::new(state.clone());
                if next != END {
                    checkpoint = checkpoint.with_next(&next);
                }
                checkpointer
                    .put(
                        thread,
                        checkpoint,
                        CheckpointMetadata::new(CheckpointSource::Loop, step),
                    )
                    .await?;
                step += 1;
            }

            current = next;
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateGraph;
    use agentflow_checkpoint::InMemorySaver;
    use futures::StreamExt;
    use serde_json::json;
    use std::collections::HashMap;

    fn counter_graph() -> StateGraph {
        StateGraph::new("counter")
            .add_node("increment", |state| {
                Box::pin(async move {
                    let count = state["count"].as_i64().unwrap_or(0);
                    Ok(json!({ "count": count + 1 }))
                })
            })
            .set_entry("increment")
    }

    #[test]
    fn test_merge_state_shallow() {
        let merged = merge_state(
            json!({"a": 1, "b": {"x": 1}}),
            json!({"b": {"y": 2}, "c": 3}),
            false,
        )
        .unwrap();
        assert_eq!(merged, json!({"a": 1, "b": {"y": 2}, "c": 3}));
    }

    #[test]
    fn test_merge_state_null_is_identity() {
        let merged = merge_state(json!({"a": 1}), Value::Null, false).unwrap();
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn test_merge_state_messages_reducer() {
        let base = json!({"messages": [Message::user("hi").with_id("m1")]});
        let update = json!({"messages": [Message::assistant("hello").with_id("m2")]});
        let merged = merge_state(base, update, true).unwrap();
        let messages = merged["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_invoke_linear_pipeline() {
        let graph = StateGraph::new("pipeline")
            .add_node("double", |state| {
                Box::pin(async move {
                    let n = state["n"].as_i64().unwrap_or(0);
                    Ok(json!({ "n": n * 2 }))
                })
            })
            .add_node("describe", |state| {
                Box::pin(async move {
                    let n = state["n"].as_i64().unwrap_or(0);
                    Ok(json!({ "summary": format!("n is {n}") }))
                })
            })
            .set_entry("double")
            .add_edge("double", "describe")
            .add_edge("describe", END)
            .compile()
            .unwrap();

        let result = graph.invoke(json!({"n": 21})).await.unwrap();
        assert_eq!(result["n"], 42);
        assert_eq!(result["summary"], "n is 42");
    }

    #[tokio::test]
    async fn test_conditional_loop_until_done() {
        let graph = StateGraph::new("loop")
            .add_node("work", |state| {
                Box::pin(async move {
                    let n = state["n"].as_i64().unwrap_or(0);
                    Ok(json!({ "n": n + 1 }))
                })
            })
            .set_entry("work")
            .add_conditional_edge(
                "work",
                |state| {
                    if state["n"].as_i64().unwrap_or(0) >= 3 {
                        "done".to_string()
                    } else {
                        "again".to_string()
                    }
                },
                HashMap::from([
                    ("again".to_string(), "work".to_string()),
                    ("done".to_string(), END.to_string()),
                ]),
            )
            .compile()
            .unwrap();

        let result = graph.invoke(json!({"n": 0})).await.unwrap();
        assert_eq!(result["n"], 3);
    }

    #[tokio::test]
    async fn test_recursion_limit_trips() {
        let graph = StateGraph::new("forever")
            .add_node("spin", |state| Box::pin(async move { Ok(state) }))
            .set_entry("spin")
            .add_edge("spin", "spin")
            .compile()
            .unwrap()
            .with_recursion_limit(5);

        let err = graph.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::RecursionLimit(5)));
    }

    #[tokio::test]
    async fn test_node_errors_carry_node_name() {
        let graph = StateGraph::new("failing")
            .add_node("boom", |_| {
                Box::pin(async move {
                    Err(GraphError::Validation("internal problem".to_string()))
                })
            })
            .set_entry("boom")
            .add_edge("boom", END)
            .compile()
            .unwrap();

        let err = graph.invoke(json!({})).await.unwrap_err();
        match err {
            GraphError::NodeExecution { node, message } => {
                assert_eq!(node, "boom");
                assert!(message.contains("internal problem"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_branch_is_an_error() {
        let graph = StateGraph::new("router")
            .add_node("n", |state| Box::pin(async move { Ok(state) }))
            .set_entry("n")
            .add_conditional_edge(
                "n",
                |_| "nowhere".to_string(),
                HashMap::from([("somewhere".to_string(), END.to_string())]),
            )
            .compile()
            .unwrap();

        let err = graph.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[tokio::test]
    async fn test_thread_state_persists_across_invokes() {
        let saver = Arc::new(InMemorySaver::new());
        let graph = counter_graph()
            .add_edge("increment", END)
            .compile()
            .unwrap()
            .with_checkpointer(saver);

        let thread = ThreadConfig::new("thread-1");
        let first = graph
            .invoke_with_config(json!({"count": 0}), Some(thread.clone()))
            .await
            .unwrap();
        assert_eq!(first["count"], 1);

        // Second turn starts from the saved state.
        let second = graph
            .invoke_with_config(Value::Null, Some(thread.clone()))
            .await
            .unwrap();
        assert_eq!(second["count"], 2);

        let snapshot = graph.get_state(&thread).await.unwrap().unwrap();
        assert_eq!(snapshot.values["count"], 2);
        assert!(snapshot.next.is_none());
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let saver = Arc::new(InMemorySaver::new());
        let graph = counter_graph()
            .add_edge("increment", END)
            .compile()
            .unwrap()
            .with_checkpointer(saver);

        for _ in 0..3 {
            graph
                .invoke_with_config(Value::Null, Some(ThreadConfig::new("a")))
                .await
                .unwrap();
        }
        let other = graph
            .invoke_with_config(Value::Null, Some(ThreadConfig::new("b")))
            .await
            .unwrap();
        assert_eq!(other["count"], 1);
    }

    #[tokio::test]
    async fn test_interrupt_pause_and_resume() {
        let saver = Arc::new(InMemorySaver::new());
        let graph = StateGraph::new("approval")
            .add_node("draft", |_| {
                Box::pin(async move { Ok(json!({"draft": "v1"})) })
            })
            .add_node("publish", |_| {
                Box::pin(async move { Ok(json!({"published": true})) })
            })
            .set_entry("draft")
            .add_edge("draft", "publish")
            .add_edge("publish", END)
            .compile()
            .unwrap()
            .with_checkpointer(saver)
            .with_interrupt_before(["publish"]);

        let thread = ThreadConfig::new("t");
        let err = graph
            .invoke_with_config(json!({}), Some(thread.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Interrupted { ref node } if node == "publish"));

        let paused = graph.get_state(&thread).await.unwrap().unwrap();
        assert_eq!(paused.next.as_deref(), Some("publish"));
        assert_eq!(paused.values["draft"], "v1");
        assert!(paused.values.get("published").is_none());

        let finished = graph
            .invoke_with_config(Value::Null, Some(thread.clone()))
            .await
            .unwrap();
        assert_eq!(finished["published"], true);
    }

    #[tokio::test]
    async fn test_update_state_during_pause() {
        let saver = Arc::new(InMemorySaver::new());
        let graph = StateGraph::new("edit")
            .add_node("draft", |_| {
                Box::pin(async move { Ok(json!({"text": "draft"})) })
            })
            .add_node("publish", |state| {
                Box::pin(async move {
                    let text = state["text"].as_str().unwrap_or("").to_string();
                    Ok(json!({"final": text}))
                })
            })
            .set_entry("draft")
            .add_edge("draft", "publish")
            .add_edge("publish", END)
            .compile()
            .unwrap()
            .with_checkpointer(saver)
            .with_interrupt_before(["publish"]);

        let thread = ThreadConfig::new("t");
        let _ = graph
            .invoke_with_config(json!({}), Some(thread.clone()))
            .await
            .unwrap_err();

        graph
            .update_state(&thread, json!({"text": "edited"}))
            .await
            .unwrap();

        let snapshot = graph.get_state(&thread).await.unwrap().unwrap();
        assert_eq!(snapshot.source, CheckpointSource::Update);
        assert_eq!(snapshot.next.as_deref(), Some("publish"));

        let finished = graph
            .invoke_with_config(Value::Null, Some(thread))
            .await
            .unwrap();
        assert_eq!(finished["final"], "edited");
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let saver = Arc::new(InMemorySaver::new());
        let graph = counter_graph()
            .add_edge("increment", END)
            .compile()
            .unwrap()
            .with_checkpointer(saver);

        let thread = ThreadConfig::new("t");
        graph
            .invoke_with_config(json!({"count": 0}), Some(thread.clone()))
            .await
            .unwrap();

        // One input snapshot plus one per-node snapshot.
        let history = graph.get_state_history(&thread, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].source, CheckpointSource::Loop);
        assert_eq!(history[0].step, 1);
        assert_eq!(history[1].source, CheckpointSource::Input);
        assert_eq!(history[1].step, 0);
    }

    #[tokio::test]
    async fn test_get_state_without_checkpointer_errors() {
        let graph = counter_graph().add_edge("increment", END).compile().unwrap();
        let err = graph
            .get_state(&ThreadConfig::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[tokio::test]
    async fn test_stream_updates_and_done() {
        let graph = StateGraph::new("stream")
            .add_node("a", |_| Box::pin(async move { Ok(json!({"a": 1})) }))
            .add_node("b", |_| Box::pin(async move { Ok(json!({"b": 2})) }))
            .set_entry("a")
            .add_edge("a", "b")
            .add_edge("b", END)
            .compile()
            .unwrap();

        let events: Vec<StreamEvent> = graph
            .stream(json!({}), None, &[StreamMode::Updates])
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], StreamEvent::Updates { node, .. } if node == "a"));
        assert!(matches!(&events[1], StreamEvent::Updates { node, .. } if node == "b"));
        match &events[2] {
            StreamEvent::Done { values } => {
                assert_eq!(values["a"], 1);
                assert_eq!(values["b"], 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_debug_mode_emits_node_starts() {
        let graph = counter_graph().add_edge("increment", END).compile().unwrap();
        let events: Vec<StreamEvent> = graph
            .stream(json!({}), None, &[StreamMode::Debug])
            .collect()
            .await;
        assert!(matches!(&events[0], StreamEvent::NodeStart { node } if node == "increment"));
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_stream_reports_interrupt() {
        let graph = counter_graph()
            .add_edge("increment", END)
            .compile()
            .unwrap()
            .with_interrupt_before(["increment"]);

        let events: Vec<StreamEvent> = graph.stream(json!({}), None, &[]).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Interrupted { node } if node == "increment"));
    }

    #[tokio::test]
    async fn test_messages_mode_appends_across_nodes() {
        let graph = StateGraph::new("chat")
            .with_messages()
            .add_node("respond", |_| {
                Box::pin(async move {
                    Ok(json!({"messages": [Message::assistant("hello there")]}))
                })
            })
            .set_entry("respond")
            .add_edge("respond", END)
            .compile()
            .unwrap();

        let result = graph
            .invoke(json!({"messages": [Message::user("hi")]}))
            .await
            .unwrap();
        let messages = result["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
    }
}
