//! ToolExecutor - named registry of external capabilities

use std::collections::HashMap;

use crate::config::SearchConfig;
use crate::llm::{ToolCall, ToolDefinition};

use super::builtin::{ExtractTool, SearchTool};
use super::{Tool, ToolContext, ToolResult};

/// Manages the set of tools the model may invoke
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create executor with the standard research tools
    ///
    /// `search` finds candidate URLs; `extract` pulls readable content out of
    /// one of them.
    pub fn standard(search: &SearchConfig) -> Self {
        let mut tools: HashMap<String, Box<dyn Tool>> = HashMap::new();

        tools.insert("search".into(), Box::new(SearchTool::new(search.resolve_api_key())));
        tools.insert("extract".into(), Box::new(ExtractTool::new()));

        Self { tools }
    }

    /// Create an empty executor (for testing)
    pub fn empty() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Add a tool to the executor
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get tool definitions for the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool call
    pub async fn execute(&self, tool_call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        ctx.record_invocation();
        match self.tools.get(&tool_call.name) {
            Some(tool) => tool.execute(tool_call.input.clone(), ctx).await,
            None => ToolResult::error(format!("Unknown tool: {}", tool_call.name)),
        }
    }

    /// Execute multiple tool calls in order
    ///
    /// Returns (tool name, result) pairs - the name is the pairing key the
    /// model expects in functionResponse parts.
    pub async fn execute_all(&self, tool_calls: &[ToolCall], ctx: &ToolContext) -> Vec<(String, ToolResult)> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            let result = self.execute(call, ctx).await;
            results.push((call.name.clone(), result));
        }

        results
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_executor() -> ToolExecutor {
        ToolExecutor::standard(&SearchConfig::default())
    }

    #[test]
    fn test_standard_executor_has_research_tools() {
        let executor = standard_executor();

        assert!(executor.has_tool("search"));
        assert!(executor.has_tool("extract"));
        assert!(!executor.has_tool("bash"));
    }

    #[test]
    fn test_definitions_returns_all_tools() {
        let executor = standard_executor();
        let defs = executor.definitions();

        assert_eq!(defs.len(), 2);
        assert!(defs.iter().any(|d| d.name == "search"));
        assert!(defs.iter().any(|d| d.name == "extract"));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let executor = ToolExecutor::empty();
        let ctx = ToolContext::new("test");

        let call = ToolCall {
            name: "unknown_tool".to_string(),
            input: serde_json::json!({}),
        };

        let result = executor.execute(&call, &ctx).await;
        assert!(result.is_error);
        assert!(result.content.contains("Unknown tool"));
        assert_eq!(ctx.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_execute_all_preserves_order() {
        let executor = ToolExecutor::empty();
        let ctx = ToolContext::new("test");

        let calls = vec![
            ToolCall {
                name: "a".to_string(),
                input: serde_json::json!({}),
            },
            ToolCall {
                name: "b".to_string(),
                input: serde_json::json!({}),
            },
        ];

        let results = executor.execute_all(&calls, &ctx).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "b");
    }
}
