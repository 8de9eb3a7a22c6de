//! Domain types for Museflow
//!
//! Record types persisted through the state manager, plus ID generation.

mod id;
mod records;

pub use id::{generate_id, new_thread_id};
pub use records::{AgentResult, Chat, ChatMessage, Idea, PlanDoc, Project};
