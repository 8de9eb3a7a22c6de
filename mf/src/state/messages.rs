//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{AgentResult, Chat, Idea, PlanDoc, Project};

/// Errors from state operations
///
/// Kept distinct from generation errors so callers can tell persistence
/// failures apart from model failures.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Project operations
    CreateProject {
        project: Project,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    GetProject {
        id: String,
        owner: String,
        reply: oneshot::Sender<StateResponse<Option<Project>>>,
    },
    UpdateProject {
        project: Project,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Idea operations
    CreateIdea {
        idea: Idea,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    GetIdea {
        id: String,
        owner: String,
        reply: oneshot::Sender<StateResponse<Option<Idea>>>,
    },
    UpdateIdea {
        idea: Idea,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListIdeas {
        owner: String,
        project_id: String,
        reply: oneshot::Sender<StateResponse<Vec<Idea>>>,
    },

    // Chat operations
    CreateChat {
        chat: Chat,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    GetChat {
        id: String,
        owner: String,
        reply: oneshot::Sender<StateResponse<Option<Chat>>>,
    },
    UpdateChat {
        chat: Chat,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Plan document operations
    CreatePlanDoc {
        plan: PlanDoc,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    GetPlanDoc {
        id: String,
        owner: String,
        reply: oneshot::Sender<StateResponse<Option<PlanDoc>>>,
    },
    UpdatePlanDoc {
        plan: PlanDoc,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Agent result operations
    CreateAgentResult {
        result: AgentResult,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    GetAgentResult {
        id: String,
        owner: String,
        reply: oneshot::Sender<StateResponse<Option<AgentResult>>>,
    },
    UpdateAgentResult {
        result: AgentResult,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Workflow checkpoint operations
    WriteCheckpoint {
        thread_id: String,
        body: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ReadCheckpoint {
        thread_id: String,
        reply: oneshot::Sender<StateResponse<Option<String>>>,
    },

    // Shutdown
    Shutdown,
}
