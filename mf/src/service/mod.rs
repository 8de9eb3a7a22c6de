//! Service layer
//!
//! The operations an API surface would call: brainstorming chats, idea
//! reports, plan recommendation/organization, and agent-backed idea search.
//! Only persistence and lookup failures become hard errors here; generation
//! failures inside a workflow run are absorbed into the result content.

mod idea;
mod project;

pub use idea::IdeaService;
pub use project::{ProjectService, SearchOutcome};

use thiserror::Error;

use crate::llm::LlmError;
use crate::state::StateError;

/// Errors surfaced by the service layer
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] StateError),

    #[error("Generation error: {0}")]
    Generation(#[from] LlmError),

    #[error("Workflow error: {0}")]
    Workflow(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_distinct_from_generation() {
        let store: ServiceError = StateError::NotFound("x".to_string()).into();
        let generation: ServiceError = LlmError::InvalidResponse("y".to_string()).into();

        assert!(matches!(store, ServiceError::Store(_)));
        assert!(matches!(generation, ServiceError::Generation(_)));
    }
}
