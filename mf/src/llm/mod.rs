//! Model gateway for Museflow
//!
//! Wraps one LLM behind the [`LlmClient`] trait: single-shot or streaming
//! text generation with optional history, system instruction, per-call tool
//! bindings, and structured-output mode.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use types::{
    ContentBlock, GenerateRequest, GenerateResponse, Message, MessageContent, Role, StopReason, StreamChunk,
    TokenUsage, ToolCall, ToolDefinition,
};

use crate::config::LlmConfig;

/// Create a model gateway based on the provider specified in config
///
/// Currently only "gemini" is supported; the match keeps the seam where other
/// providers would plug in.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::from_config(config)?)),
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown LLM provider: '{}'. Supported: gemini",
            other
        ))),
    }
}
