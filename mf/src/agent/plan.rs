//! Plan parsing - structured step lists out of raw model text
//!
//! Model output is unreliable: sometimes a clean fenced JSON block, sometimes
//! bare JSON, sometimes prose. `parse_plan` is total - it tries an ordered
//! list of strategies and always produces at least one step, so a run can
//! always make forward progress.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::Message;

/// Lifecycle status of one plan step
///
/// Moves forward only: created `NotStarted`, marked `InProgress` when
/// selected, then `Completed` or `Blocked`. Never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

impl StepStatus {
    /// True if the step still needs execution
    pub fn is_pending(&self) -> bool {
        matches!(self, StepStatus::NotStarted | StepStatus::InProgress)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// One unit of work in the plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Execution order key (ties keep original order)
    pub sequence: i64,

    /// What this step is meant to achieve
    pub task: String,

    /// Normalized sub-action text (one action per line)
    pub action: String,

    /// Lifecycle status
    pub status: StepStatus,

    /// Conversation turns exchanged while executing this step (append-only)
    #[serde(default)]
    pub trace: Vec<Message>,

    /// Accumulated text result (append-only)
    #[serde(default)]
    pub result: String,
}

impl PlanStep {
    /// Create a fresh, unexecuted step
    pub fn new(sequence: i64, task: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            sequence,
            task: task.into(),
            action: action.into(),
            status: StepStatus::NotStarted,
            trace: Vec::new(),
            result: String::new(),
        }
    }
}

/// Parse raw model text into an ordered, non-empty list of plan steps
///
/// `initial_request` is the original user request, used for the last-resort
/// fallback step when the response yields nothing usable.
pub fn parse_plan(raw: &str, initial_request: &str) -> Vec<PlanStep> {
    debug!(raw_len = raw.len(), "parse_plan: called");

    // Ordered strategies; the first one that produces a value wins
    let strategies: [fn(&str) -> Option<Value>; 3] =
        [parse_fenced_json_block, parse_stripped_whole_text, wrap_raw_text];

    let value = strategies.iter().find_map(|strategy| strategy(raw));

    let mut steps = match value {
        Some(parsed) => shape_steps(parsed),
        None => Vec::new(),
    };

    if steps.is_empty() {
        warn!("parse_plan: no usable plan in response, falling back to the initial request");
        steps.push(PlanStep::new(
            1,
            initial_request,
            "No generated plan was available; carry out the initial request directly.",
        ));
    }

    steps.sort_by_key(|s| s.sequence);
    debug!(step_count = steps.len(), "parse_plan: done");
    steps
}

/// Strategy 1: a fenced block tagged as JSON
fn parse_fenced_json_block(raw: &str) -> Option<Value> {
    let start = raw.find("```json")?;
    let inner_start = start + "```json".len();
    let end = raw[inner_start..].find("```")?;
    let inner = raw[inner_start..inner_start + end].trim();
    if inner.is_empty() {
        return None;
    }
    let value = serde_json::from_str(inner).ok()?;
    debug!("parse_fenced_json_block: parsed fenced block");
    Some(value)
}

/// Strategy 2: the whole text, with any surrounding bare fences stripped
fn parse_stripped_whole_text(raw: &str) -> Option<Value> {
    let mut text = raw.trim();
    if text.starts_with("```") && text.ends_with("```") && text.len() >= 6 {
        text = text[3..text.len() - 3].trim();
    }
    if text.is_empty() {
        return None;
    }
    let value = serde_json::from_str(text).ok()?;
    debug!("parse_stripped_whole_text: parsed whole response");
    Some(value)
}

/// Strategy 3: keep the raw text, flagged as unparsed
fn wrap_raw_text(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    debug!("wrap_raw_text: using raw text as plan data");
    Some(serde_json::json!({ "text": raw, "is_raw_text": true }))
}

/// Shape a parsed JSON value into plan steps
fn shape_steps(value: Value) -> Vec<PlanStep> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let record = item.as_object()?;
                let sequence = record
                    .get("plan_sequence")
                    .and_then(Value::as_i64)
                    .unwrap_or(index as i64 + 1);
                let task = record.get("task").and_then(Value::as_str).unwrap_or("").to_string();
                let action = normalize_action(record.get("action"));
                Some(PlanStep::new(sequence, task, action))
            })
            .collect(),
        Value::Object(record) => {
            let text = record.get("text").and_then(Value::as_str).unwrap_or("");
            if text.trim().is_empty() {
                warn!("shape_steps: plan data is not a list and has no usable text");
                Vec::new()
            } else {
                vec![PlanStep::new(1, text, "manual review needed")]
            }
        }
        _ => Vec::new(),
    }
}

/// Normalize an action field: a list of strings joins into one string, a
/// non-list value is coerced to text
fn normalize_action(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const REQUEST: &str = "find songs similar to Self Control";

    #[test]
    fn test_fenced_block_roundtrip() {
        let raw = "Here is your plan:\n```json\n[{\"plan_sequence\":1,\"task\":\"T\",\"action\":[\"a\",\"b\"]}]\n```\nDone.";
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].sequence, 1);
        assert_eq!(steps[0].task, "T");
        assert_eq!(steps[0].action, "a\nb");
        assert_eq!(steps[0].status, StepStatus::NotStarted);
        assert!(steps[0].trace.is_empty());
        assert!(steps[0].result.is_empty());
    }

    #[test]
    fn test_bare_json_without_fences() {
        let raw = r#"[{"plan_sequence":2,"task":"second","action":"x"},{"plan_sequence":1,"task":"first","action":"y"}]"#;
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].task, "first");
        assert_eq!(steps[1].task, "second");
    }

    #[test]
    fn test_bare_fences_stripped() {
        let raw = "```\n[{\"plan_sequence\":1,\"task\":\"T\",\"action\":[]}]\n```";
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].task, "T");
        assert_eq!(steps[0].action, "");
    }

    #[test]
    fn test_malformed_json_becomes_raw_text_step() {
        let raw = "I could not produce JSON, sorry {{";
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].task, raw);
        assert_eq!(steps[0].action, "manual review needed");
    }

    #[test]
    fn test_empty_response_falls_back_to_initial_request() {
        let steps = parse_plan("", REQUEST);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].task, REQUEST);
        assert_eq!(steps[0].status, StepStatus::NotStarted);
        assert!(!steps[0].action.is_empty());
    }

    #[test]
    fn test_non_list_non_text_falls_back_to_initial_request() {
        // A dict without a text field has nothing usable
        let raw = r#"{"unexpected": 42}"#;
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].task, REQUEST);
    }

    #[test]
    fn test_missing_sequence_defaults_to_position() {
        let raw = r#"[{"task":"a","action":"x"},{"task":"b","action":"y"}]"#;
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].sequence, 1);
        assert_eq!(steps[0].task, "a");
        assert_eq!(steps[1].sequence, 2);
    }

    #[test]
    fn test_non_object_entries_are_skipped() {
        let raw = r#"[{"plan_sequence":1,"task":"keep","action":""}, "stray string", 7]"#;
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].task, "keep");
    }

    #[test]
    fn test_fenced_block_with_garbage_falls_through() {
        // The fenced strategy fails, the whole-text strategy fails, so the
        // raw text survives as a single manual-review step
        let raw = "```json\nnot json at all\n```";
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action, "manual review needed");
    }

    #[test]
    fn test_action_coercion() {
        let raw = r#"[{"plan_sequence":1,"task":"t","action":{"odd":"shape"}}]"#;
        let steps = parse_plan(raw, REQUEST);

        assert_eq!(steps.len(), 1);
        assert!(steps[0].action.contains("odd"));
    }

    #[test]
    fn test_sorted_by_sequence() {
        let raw = r#"[
            {"plan_sequence":3,"task":"c","action":""},
            {"plan_sequence":1,"task":"a","action":""},
            {"plan_sequence":2,"task":"b","action":""}
        ]"#;
        let steps = parse_plan(raw, REQUEST);

        let order: Vec<&str> = steps.iter().map(|s| s.task.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_step_status_display() {
        assert_eq!(StepStatus::NotStarted.to_string(), "not_started");
        assert_eq!(StepStatus::InProgress.to_string(), "in_progress");
        assert_eq!(StepStatus::Completed.to_string(), "completed");
        assert_eq!(StepStatus::Blocked.to_string(), "blocked");
    }

    #[test]
    fn test_step_status_serde() {
        let json = serde_json::to_string(&StepStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: StepStatus = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(back, StepStatus::Blocked);
    }

    proptest! {
        /// Totality: any input yields a non-empty list sorted by sequence
        #[test]
        fn prop_parse_plan_total(raw in ".{0,400}") {
            let steps = parse_plan(&raw, REQUEST);
            prop_assert!(!steps.is_empty());
            for pair in steps.windows(2) {
                prop_assert!(pair[0].sequence <= pair[1].sequence);
            }
            for step in &steps {
                prop_assert_eq!(step.status, StepStatus::NotStarted);
            }
        }
    }
}
