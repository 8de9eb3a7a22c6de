//! ToolSession - bounded-lifetime tool binding for one step execution
//!
//! A session is acquired at the start of one execute_step call and released
//! when dropped, whether the step succeeded or failed. No tool state leaks
//! across steps.

use tracing::debug;

use crate::llm::{ToolCall, ToolDefinition};

use super::context::ToolContext;
use super::executor::ToolExecutor;
use super::traits::ToolResult;

/// A scoped binding of the tool executor to one step execution
pub struct ToolSession<'a> {
    executor: &'a ToolExecutor,
    ctx: ToolContext,
}

impl<'a> ToolSession<'a> {
    /// Acquire a session for one step execution
    pub fn acquire(executor: &'a ToolExecutor, session_id: impl Into<String>) -> Self {
        let ctx = ToolContext::new(session_id);
        debug!(session_id = %ctx.session_id, "ToolSession::acquire: called");
        Self { executor, ctx }
    }

    /// Session id for log correlation
    pub fn id(&self) -> &str {
        &self.ctx.session_id
    }

    /// Tool definitions to bind to the model call
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.executor.definitions()
    }

    /// Execute the model's tool calls in order
    pub async fn execute_all(&self, tool_calls: &[ToolCall]) -> Vec<(String, ToolResult)> {
        debug!(session_id = %self.ctx.session_id, count = tool_calls.len(), "ToolSession::execute_all: called");
        self.executor.execute_all(tool_calls, &self.ctx).await
    }

    /// Number of tool invocations made through this session
    pub fn invocation_count(&self) -> u32 {
        self.ctx.invocation_count()
    }
}

impl Drop for ToolSession<'_> {
    fn drop(&mut self) {
        debug!(
            session_id = %self.ctx.session_id,
            invocations = self.ctx.invocation_count(),
            "ToolSession released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_scopes_invocations() {
        let executor = ToolExecutor::empty();

        let first = {
            let session = ToolSession::acquire(&executor, "step-0");
            let calls = vec![ToolCall {
                name: "missing".to_string(),
                input: serde_json::json!({}),
            }];
            session.execute_all(&calls).await;
            session.invocation_count()
        };
        assert_eq!(first, 1);

        // A fresh session starts counting from zero - nothing carried over
        let session = ToolSession::acquire(&executor, "step-1");
        assert_eq!(session.invocation_count(), 0);
    }

    #[test]
    fn test_session_exposes_definitions() {
        let executor = ToolExecutor::empty();
        let session = ToolSession::acquire(&executor, "step-0");
        assert!(session.definitions().is_empty());
        assert_eq!(session.id(), "step-0");
    }
}
