//! Museflow - LLM-orchestrated idea research and brainstorming backend
//!
//! Museflow turns free-form creative requests into researched, cited answers
//! and persists the results. The centerpiece is a resumable workflow engine:
//! create a plan, execute each step with search/extraction tools bound to
//! the model, and finalize a structured summary with citations. State is
//! checkpointed per continuation id, so runs survive process restarts.
//!
//! # Modules
//!
//! - [`llm`] - model gateway trait and the Gemini implementation
//! - [`tools`] - tool gateway (web search, content extraction)
//! - [`agent`] - plan/summary parsers and the workflow engine
//! - [`state`] - actor-pattern state manager over the record store
//! - [`domain`] - persisted record types
//! - [`service`] - idea and project services
//! - [`prompts`] - embedded prompt templates with file overrides
//! - [`config`] - configuration types and loading

pub mod agent;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod prompts;
pub mod service;
pub mod state;
pub mod tools;

// Re-export commonly used types
pub use agent::{FinalSummary, Node, PlanStep, Reference, RunInput, RunState, StepStatus, WorkflowEngine};
pub use config::{AgentConfig, Config, LlmConfig, SearchConfig, StorageConfig};
pub use domain::{AgentResult, Chat, ChatMessage, Idea, PlanDoc, Project};
pub use llm::{GeminiClient, GenerateRequest, GenerateResponse, LlmClient, LlmError, create_client};
pub use prompts::PromptLoader;
pub use service::{IdeaService, ProjectService, SearchOutcome, ServiceError};
pub use state::{StateError, StateManager};
pub use tools::{Tool, ToolContext, ToolExecutor, ToolResult, ToolSession};
