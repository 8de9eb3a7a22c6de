//! The planning-and-execution workflow agent
//!
//! - [`plan`] - plan parsing (raw model text into ordered steps)
//! - [`summary`] - summary parsing (narrative answer plus citations)
//! - [`state`] - checkpointed run state and the node machine
//! - [`engine`] - the resumable workflow engine itself

pub mod engine;
pub mod plan;
pub mod state;
pub mod summary;

pub use engine::WorkflowEngine;
pub use plan::{PlanStep, StepStatus, parse_plan};
pub use state::{Node, RunInput, RunState};
pub use summary::{FinalSummary, Reference, parse_summary};
