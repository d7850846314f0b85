//! Error type shared by the cookbook chapters and CLI

/// Errors surfaced by chapters, tool execution and configuration
#[derive(Debug, thiserror::Error)]
pub enum CookbookError {
    #[error(transparent)]
    Graph(#[from] agentflow_core::GraphError),

    #[error(transparent)]
    Storage(#[from] agentflow_checkpoint::StorageError),

    #[error(transparent)]
    Llm(#[from] agentflow_llm::LlmError),

    #[error(transparent)]
    Tool(#[from] agentflow_core::ToolError),

    #[error("unknown chapter '{0}'; run `cookbook list` to see what is available")]
    UnknownChapter(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CookbookError>;

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_core::ToolError;

    #[test]
    fn test_tool_error_converts() {
        let err: CookbookError = ToolError::UnknownTool("nope".to_string()).into();
        assert!(matches!(
            err,
            CookbookError::Tool(ToolError::UnknownTool(_))
        ));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_unknown_chapter_message() {
        let err = CookbookError::UnknownChapter("advanced".to_string());
        assert!(err.to_string().contains("advanced"));
        assert!(err.to_string().contains("cookbook list"));
    }
}
