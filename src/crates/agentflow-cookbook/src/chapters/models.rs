//! Provider configuration and chat requests

use std::sync::Arc;

use serde_json::json;

use agentflow_core::{messages_from_state, CompiledGraph, GraphError, Message, StateGraph, END};
use agentflow_llm::{
    ChatModel, ChatRequest, LlmConfig, LlmProvider, ScriptedModel, DEFAULT_PROVIDER_VAR,
};

use crate::chapters::heading;
use crate::config::AppConfig;
use crate::error::Result;

/// One assistant node answering from a scripted model
fn scripted_chat_graph(
    model: Arc<ScriptedModel>,
) -> std::result::Result<CompiledGraph, GraphError> {
    StateGraph::new("scripted_chat")
        .with_messages()
        .add_node("assistant", move |state| {
            let model = model.clone();
            Box::pin(async move {
                let request = ChatRequest::new(messages_from_state(&state));
                let response = model
                    .chat(request)
                    .await
                    .map_err(|err| GraphError::node_execution("assistant", err.to_string()))?;
                Ok(json!({ "messages": [response.message] }))
            })
        })
        .set_entry("assistant")
        .add_edge("assistant", END)
        .compile()
}

pub async fn run(config: &AppConfig) -> Result<()> {
    heading("models: provider configuration and chat requests");

    // The provider the rest of the app would use right now.
    println!(
        "{DEFAULT_PROVIDER_VAR} resolves to: {}",
        config.llm.provider
    );

    // Validation names every missing field at once, per provider, so a bad
    // deployment fails with one complete message instead of a drip of errors.
    for provider in LlmProvider::ALL {
        match LlmConfig::new(provider).validate() {
            Ok(()) => println!("{provider}: ready"),
            Err(err) => println!("{provider}: {err}"),
        }
    }

    // Credentials never reach the logs; the debug form masks them.
    let configured = LlmConfig::new(LlmProvider::OpenAi)
        .with_api_key("sk-secret-123456")
        .with_model("gpt-4o-mini")
        .with_temperature(0.2);
    println!("debug view of a configured client: {configured:?}");

    // A scripted model plays the provider role offline. Replies come back in
    // the order they were loaded, through the same ChatModel trait a live
    // client implements.
    let model = ScriptedModel::with_replies(
        "demo-model",
        ["Hello! How can I help?", "Goodbye, and good luck!"],
    );
    for text in ["hi there", "bye"] {
        let request = ChatRequest::new(vec![Message::user(text)]);
        let response = model.chat(request).await?;
        println!(
            "user: {text:?} -> {}: {:?}",
            model.model_name(),
            response.message.content
        );
    }
    println!("scripted replies remaining: {}", model.remaining());

    // The same scripted replies can drive a graph node, which is how a model
    // slots into a workflow: the node reads the conversation from state and
    // appends its reply.
    let model = Arc::new(ScriptedModel::with_replies(
        "demo-model",
        ["Paris has about 2.1 million residents."],
    ));
    let graph = scripted_chat_graph(model)?;
    let state = graph
        .invoke(json!({ "messages": [Message::user("How many people live in Paris?")] }))
        .await?;
    println!("one-node chat graph:");
    for message in messages_from_state(&state) {
        println!("  [{}] {}", message.role, message.content);
    }

    Ok(())
}
