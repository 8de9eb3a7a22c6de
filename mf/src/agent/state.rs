//! Run state - the checkpointed state of one workflow run

use serde::{Deserialize, Serialize};

use crate::llm::Message;

use super::plan::{PlanStep, StepStatus};
use super::summary::FinalSummary;

/// Workflow node - the next transition to run
///
/// An explicit enumerated state type with a match-based transition loop;
/// conditional edges live in the engine, not in a string-keyed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    CreatePlan,
    IdentifyStep,
    ExecuteStep,
    Finalize,
    Done,
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreatePlan => write!(f, "create_plan"),
            Self::IdentifyStep => write!(f, "identify_step"),
            Self::ExecuteStep => write!(f, "execute_step"),
            Self::Finalize => write!(f, "finalize"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Input to a run: the user's request plus any prior conversation
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub initial_request: String,
    pub conversation: Vec<Message>,
}

impl RunInput {
    /// A fresh run for a bare request
    pub fn from_request(request: impl Into<String>) -> Self {
        let initial_request = request.into();
        let conversation = vec![Message::user(initial_request.clone())];
        Self {
            initial_request,
            conversation,
        }
    }
}

/// The full persisted state of one run, checkpointed after every transition
///
/// Owned exclusively by the workflow engine for the lifetime of the run;
/// steps are mutated in place by index, nothing else holds a reference into
/// the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Original user text, immutable once set
    pub initial_request: String,

    /// The plan, set once by plan creation, statuses mutated by execution
    pub plan_steps: Vec<PlanStep>,

    /// Index of the step currently selected, None when nothing is pending
    pub current_step_index: Option<usize>,

    /// Per-step outcome summaries, append-only
    pub step_results: Vec<String>,

    /// Structured final result, set exactly once at finalization
    pub final_summary: Option<FinalSummary>,

    /// All messages exchanged across the run, append-only (audit)
    pub conversation: Vec<Message>,

    /// Next node to run; Done is terminal
    pub node: Node,
}

impl RunState {
    /// Start a fresh run
    pub fn new(input: RunInput) -> Self {
        Self {
            initial_request: input.initial_request,
            plan_steps: Vec::new(),
            current_step_index: None,
            step_results: Vec::new(),
            final_summary: None,
            conversation: input.conversation,
            node: Node::CreatePlan,
        }
    }

    /// True once the run has reached its terminal node
    pub fn is_done(&self) -> bool {
        self.node == Node::Done
    }

    /// Append a message to the run-wide audit log
    pub fn push_message(&mut self, message: Message) {
        self.conversation.push(message);
    }

    /// Render the plan as a status board
    ///
    /// One line per step with a status mark, plus its action notes.
    pub fn format_plan_status(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.plan_steps.iter().enumerate() {
            let mark = match step.status {
                StepStatus::Completed => "[✓]",
                StepStatus::InProgress => "[→]",
                StepStatus::Blocked => "[!]",
                StepStatus::NotStarted => "[ ]",
            };
            out.push_str(&format!("{}. {} {}\n", i, mark, step.task));
            if !step.action.is_empty() {
                out.push_str(&format!("   Notes: {}\n", step.action));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_state() {
        let state = RunState::new(RunInput::from_request("find inspiration"));

        assert_eq!(state.initial_request, "find inspiration");
        assert_eq!(state.node, Node::CreatePlan);
        assert!(state.plan_steps.is_empty());
        assert!(state.current_step_index.is_none());
        assert!(state.final_summary.is_none());
        assert_eq!(state.conversation.len(), 1);
        assert!(!state.is_done());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut state = RunState::new(RunInput::from_request("req"));
        state.plan_steps.push(PlanStep::new(1, "task", "action"));
        state.node = Node::IdentifyStep;
        state.step_results.push("Step 0 (task): done".to_string());

        let json = serde_json::to_string(&state).unwrap();
        let back: RunState = serde_json::from_str(&json).unwrap();

        assert_eq!(back.initial_request, "req");
        assert_eq!(back.node, Node::IdentifyStep);
        assert_eq!(back.plan_steps.len(), 1);
        assert_eq!(back.step_results.len(), 1);
    }

    #[test]
    fn test_format_plan_status() {
        let mut state = RunState::new(RunInput::from_request("req"));
        state.plan_steps.push(PlanStep::new(1, "first", "look around"));
        state.plan_steps.push(PlanStep::new(2, "second", ""));
        state.plan_steps[0].status = StepStatus::Completed;
        state.plan_steps[1].status = StepStatus::InProgress;

        let board = state.format_plan_status();
        assert!(board.contains("0. [✓] first"));
        assert!(board.contains("   Notes: look around"));
        assert!(board.contains("1. [→] second"));
        // No notes line for an empty action
        assert_eq!(board.lines().count(), 3);
    }

    #[test]
    fn test_node_display() {
        assert_eq!(Node::CreatePlan.to_string(), "create_plan");
        assert_eq!(Node::Done.to_string(), "done");
    }
}
