//! LLM request/response types for Museflow
//!
//! These types model the Gemini generateContent API but are provider-agnostic
//! enough to support other providers in the future.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A generation request - everything needed for one model call
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// System instruction (rendered from a prompt template), if any
    pub system_instruction: Option<String>,

    /// Conversation history plus the current user content
    pub messages: Vec<Message>,

    /// Tools bound for this call only (empty for plain generation)
    pub tools: Vec<ToolDefinition>,

    /// Max tokens for the response (from config)
    pub max_tokens: u32,

    /// Structured-output mode: ask the model for a JSON response body
    pub json_output: bool,
}

impl GenerateRequest {
    /// Plain text generation with no tools and no system instruction
    pub fn text(content: impl Into<String>, max_tokens: u32) -> Self {
        debug!("GenerateRequest::text: called");
        Self {
            system_instruction: None,
            messages: vec![Message::user(content)],
            tools: vec![],
            max_tokens,
            json_output: false,
        }
    }

    /// Attach a system instruction
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a model message with text content
    pub fn model(text: impl Into<String>) -> Self {
        debug!("Message::model: called");
        Self {
            role: Role::Model,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a user message with multiple content blocks
    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        debug!(block_count = %blocks.len(), "Message::user_blocks: called");
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Create a model message with multiple content blocks
    pub fn model_blocks(blocks: Vec<ContentBlock>) -> Self {
        debug!(block_count = %blocks.len(), "Message::model_blocks: called");
        Self {
            role: Role::Model,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Text content, if this is a plain text message
    pub fn as_text(&self) -> Option<&str> {
        self.content.as_text()
    }
}

/// Message role
///
/// Gemini calls the assistant side "model"; callers holding history with an
/// "assistant" role should map it before building messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Message content - either plain text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Get text content if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Blocks(_) => None,
        }
    }
}

/// A content block in a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse { name: String, input: serde_json::Value },

    #[serde(rename = "tool_result")]
    ToolResult {
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Create a text content block
    pub fn text(text: impl Into<String>) -> Self {
        debug!("ContentBlock::text: called");
        ContentBlock::Text { text: text.into() }
    }

    /// Create a tool result block
    pub fn tool_result(name: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        debug!(%is_error, "ContentBlock::tool_result: called");
        ContentBlock::ToolResult {
            name: name.into(),
            content: content.into(),
            is_error,
        }
    }
}

/// Response from a generation request
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage for cost tracking
    pub usage: TokenUsage,
}

impl GenerateResponse {
    /// Plain text response (test helper shape, also used by mock)
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }
}

/// A tool call requested by the model
///
/// Gemini function calls carry no call id; the function name is the pairing
/// key between a call and its result.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    pub input: serde_json::Value,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Safety,
}

impl StopReason {
    /// Derive from a Gemini finishReason string
    ///
    /// Gemini reports STOP even for function-call turns, so tool use is
    /// inferred from the presence of function calls in the parts.
    pub fn from_finish_reason(s: &str, has_tool_calls: bool) -> Self {
        debug!(%s, %has_tool_calls, "StopReason::from_finish_reason: called");
        if has_tool_calls {
            return StopReason::ToolUse;
        }
        match s {
            "MAX_TOKENS" => StopReason::MaxTokens,
            "SAFETY" | "RECITATION" | "PROHIBITED_CONTENT" => StopReason::Safety,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token usage for cost tracking
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

impl TokenUsage {
    /// Accumulate usage from another call
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.response_tokens += other.response_tokens;
    }
}

/// Tool definition exposed to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: serde_json::Value) -> Self {
        let name = name.into();
        debug!(%name, "ToolDefinition::new: called");
        Self {
            name,
            description: description.into(),
            input_schema,
        }
    }

    /// Convert to a Gemini functionDeclaration
    pub fn to_function_declaration(&self) -> serde_json::Value {
        debug!(%self.name, "ToolDefinition::to_function_declaration: called");
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.input_schema,
        })
    }
}

/// Streaming chunk for incremental delivery to callers
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Text being generated
    TextDelta(String),

    /// Generation complete with final stats
    Done { stop_reason: StopReason, usage: TokenUsage },

    /// Error during streaming
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.as_text(), Some("Hello"));
    }

    #[test]
    fn test_message_model() {
        let msg = Message::model("Hi there");
        assert_eq!(msg.role, Role::Model);
        assert_eq!(msg.as_text(), Some("Hi there"));
    }

    #[test]
    fn test_blocks_have_no_plain_text() {
        let msg = Message::model_blocks(vec![ContentBlock::text("x")]);
        assert!(msg.as_text().is_none());
    }

    #[test]
    fn test_stop_reason_from_finish_reason() {
        assert_eq!(StopReason::from_finish_reason("STOP", false), StopReason::EndTurn);
        assert_eq!(StopReason::from_finish_reason("STOP", true), StopReason::ToolUse);
        assert_eq!(StopReason::from_finish_reason("MAX_TOKENS", false), StopReason::MaxTokens);
        assert_eq!(StopReason::from_finish_reason("SAFETY", false), StopReason::Safety);
        assert_eq!(StopReason::from_finish_reason("FINISH_REASON_UNSPECIFIED", false), StopReason::EndTurn);
    }

    #[test]
    fn test_tool_definition_to_function_declaration() {
        let tool = ToolDefinition::new(
            "search",
            "Search the web",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "required": ["query"]
            }),
        );

        let decl = tool.to_function_declaration();
        assert_eq!(decl["name"], "search");
        assert_eq!(decl["description"], "Search the web");
        assert!(decl["parameters"].is_object());
    }

    #[test]
    fn test_content_block_tool_result() {
        let block = ContentBlock::tool_result("search", "3 results", false);
        match block {
            ContentBlock::ToolResult { name, content, is_error } => {
                assert_eq!(name, "search");
                assert_eq!(content, "3 results");
                assert!(!is_error);
            }
            _ => panic!("Expected ToolResult block"),
        }
    }

    #[test]
    fn test_token_usage_add() {
        let mut usage = TokenUsage {
            prompt_tokens: 10,
            response_tokens: 5,
        };
        usage.add(TokenUsage {
            prompt_tokens: 3,
            response_tokens: 7,
        });
        assert_eq!(usage.prompt_tokens, 13);
        assert_eq!(usage.response_tokens, 12);
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = Message::model_blocks(vec![
            ContentBlock::text("looking that up"),
            ContentBlock::ToolUse {
                name: "search".to_string(),
                input: serde_json::json!({"query": "rust"}),
            },
        ]);

        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::Model);
        match back.content {
            MessageContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            _ => panic!("Expected blocks"),
        }
    }
}
