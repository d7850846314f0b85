//! A small reason-and-act loop over scripted replies

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use agentflow_core::{
    messages_from_state, GraphError, Message, StateGraph, ToolCall, ToolNode, END,
};
use agentflow_llm::{ChatModel, ChatRequest, ScriptedModel};

use crate::chapters::heading;
use crate::config::AppConfig;
use crate::error::Result;
use crate::tools::demo_registry;

pub async fn run(config: &AppConfig) -> Result<()> {
    heading("react: a small reason-and-act loop");

    let registry = demo_registry();
    let specs = registry.specs();
    let tool_node = ToolNode::new(registry);

    // Scripted turns stand in for a live model: first it asks for a tool,
    // then it answers from the tool's result.
    let model = Arc::new(ScriptedModel::new("react-demo"));
    model.push(Message::assistant_with_tool_calls(
        "",
        vec![ToolCall::new("weather_lookup", json!({ "city": "london" }))],
    ));
    model.push(Message::assistant(
        "It is raining lightly in London at 14C; pack a jacket.",
    ));

    // agent -> (tools -> agent)* -> end. The conditional edge loops through
    // the tool node for as long as the model keeps requesting calls.
    let agent_model = model.clone();
    let graph = StateGraph::new("react_agent")
        .with_messages()
        .add_node("agent", move |state| {
            let model = agent_model.clone();
            let specs = specs.clone();
            Box::pin(async move {
                let request = ChatRequest::new(messages_from_state(&state)).with_tools(specs);
                let response = model
                    .chat(request)
                    .await
                    .map_err(|err| GraphError::node_execution("agent", err.to_string()))?;
                Ok(json!({ "messages": [response.message] }))
            })
        })
        .add_node("tools", move |state| {
            let node = tool_node.clone();
            Box::pin(async move { node.run(state).await })
        })
        .set_entry("agent")
        .add_conditional_edge(
            "agent",
            |state| {
                match messages_from_state(state).last() {
                    Some(last) if !last.tool_calls.is_empty() => "tools".to_string(),
                    _ => END.to_string(),
                }
            },
            HashMap::from([("tools".to_string(), "tools".to_string())]),
        )
        .add_edge("tools", "agent")
        .compile()?
        .with_recursion_limit(config.workflow.max_iterations);

    let state = graph
        .invoke(json!({ "messages": [Message::user("What's the weather in London?")] }))
        .await?;

    println!("conversation:");
    for message in messages_from_state(&state) {
        let preview: String = message.content.chars().take(88).collect();
        if message.tool_calls.is_empty() {
            println!("  [{}] {preview}", message.role);
        } else {
            let names: Vec<&str> = message
                .tool_calls
                .iter()
                .map(|call| call.name.as_str())
                .collect();
            println!("  [{}] requests tools: {}", message.role, names.join(", "));
        }
    }

    Ok(())
}
