//! WorkflowEngine - resumable plan/execute/summarize state machine
//!
//! One run turns a free-form request into a plan, executes each step with
//! search/extraction tools bound to the model, and finalizes a structured
//! summary with citations. State is checkpointed after every node transition
//! under a caller-supplied thread id, so a run can resume after a restart.
//!
//! Failure handling is layered: a blocked step never halts the plan, and a
//! failed plan creation or finalization degrades to a well-formed terminal
//! state instead of an error.

use std::path::Path;
use std::sync::Arc;

use eyre::Result;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::llm::{ContentBlock, GenerateRequest, GenerateResponse, LlmClient, Message, StopReason};
use crate::prompts::PromptLoader;
use crate::state::StateManager;
use crate::tools::{ToolExecutor, ToolResult, ToolSession};

use super::plan::{StepStatus, parse_plan};
use super::state::{Node, RunInput, RunState};
use super::summary::{FinalSummary, parse_summary};

/// Workflow execution engine
///
/// Holds no per-run state itself - everything lives in the checkpointed
/// `RunState`, so independent runs can share one engine.
pub struct WorkflowEngine {
    /// Model gateway
    llm: Arc<dyn LlmClient>,

    /// Tool gateway (bound per step via ToolSession)
    tools: Arc<ToolExecutor>,

    /// Record store handle, used for checkpoints
    state: StateManager,

    /// Prompt templates
    prompts: PromptLoader,

    /// Max tokens per model call
    max_tokens: u32,

    /// Max model/tool turns within one step execution
    max_tool_turns: u32,
}

impl WorkflowEngine {
    /// Create a new engine
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolExecutor>,
        state: StateManager,
        prompts: PromptLoader,
        agent: &AgentConfig,
        max_tokens: u32,
    ) -> Self {
        debug!(max_tool_turns = agent.max_tool_turns, "WorkflowEngine::new: called");
        Self {
            llm,
            tools,
            state,
            prompts,
            max_tokens,
            max_tool_turns: agent.max_tool_turns,
        }
    }

    /// Run the workflow to its terminal state
    ///
    /// If a checkpoint exists for `thread_id` the run resumes from it and
    /// `input` is ignored; otherwise a fresh run starts. The returned state
    /// is always terminal and always carries a final summary.
    pub async fn run(&self, input: RunInput, thread_id: &str) -> Result<RunState> {
        info!(%thread_id, "Starting workflow run");

        let mut state = match self.load_checkpoint(thread_id).await? {
            Some(existing) => {
                info!(%thread_id, node = %existing.node, "Resuming from checkpoint");
                existing
            }
            None => RunState::new(input),
        };

        while !state.is_done() {
            let node = state.node;
            debug!(%thread_id, %node, "run: entering node");

            state.node = match node {
                Node::CreatePlan => {
                    self.create_plan(&mut state).await;
                    Node::IdentifyStep
                }
                Node::IdentifyStep => {
                    self.identify_step(&mut state);
                    if state.current_step_index.is_none() {
                        Node::Finalize
                    } else {
                        Node::ExecuteStep
                    }
                }
                Node::ExecuteStep => {
                    self.execute_step(&mut state, thread_id).await;
                    Node::IdentifyStep
                }
                Node::Finalize => {
                    self.finalize(&mut state).await;
                    Node::Done
                }
                Node::Done => Node::Done,
            };

            self.save_checkpoint(thread_id, &state).await?;
        }

        info!(%thread_id, steps = state.plan_steps.len(), "Workflow run complete");
        Ok(state)
    }

    /// Run the workflow and write a best-effort JSON snapshot of the final
    /// state to `snapshot_path` (write failures are logged, not raised)
    pub async fn run_with_snapshot(
        &self,
        input: RunInput,
        thread_id: &str,
        snapshot_path: Option<&Path>,
    ) -> Result<RunState> {
        let state = self.run(input, thread_id).await?;
        if let Some(path) = snapshot_path {
            write_state_snapshot(path, &state).await;
        }
        Ok(state)
    }

    /// Load the checkpointed plan status board for a thread, if any
    pub async fn load_state(&self, thread_id: &str) -> Result<Option<RunState>> {
        self.load_checkpoint(thread_id).await
    }

    // === Nodes ===

    /// create_plan: ask the model for a plan, parse it into steps
    ///
    /// On gateway failure the plan stays empty and a diagnostic message is
    /// recorded - the run still proceeds to a terminal state.
    async fn create_plan(&self, state: &mut RunState) {
        debug!("create_plan: called");

        let instruction = match self.prompts.render("plan-generation", &json!({})) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "create_plan: prompt render failed");
                state.push_message(Message::model(format!(
                    "Error: failed to prepare the planning prompt - {}",
                    e
                )));
                return;
            }
        };

        let request = GenerateRequest {
            system_instruction: Some(instruction),
            messages: vec![Message::user(state.initial_request.clone())],
            tools: vec![],
            max_tokens: self.max_tokens,
            json_output: false,
        };

        match self.llm.generate(request).await {
            Ok(response) => {
                let raw = response.content.unwrap_or_default();
                state.push_message(Message::model(raw.clone()));
                state.plan_steps = parse_plan(&raw, &state.initial_request);
                info!(step_count = state.plan_steps.len(), "Plan created");
            }
            Err(e) => {
                warn!(error = %e, "create_plan: generation failed");
                state.push_message(Message::model(format!("Error: failed to create a plan - {}", e)));
            }
        }
    }

    /// identify_step: select the first pending step, or none
    ///
    /// The scan is the sole scheduling mechanism: re-entering after a step
    /// completes resumes at the next pending step, and a step left
    /// in_progress by a crash is re-selected (at-least-once).
    fn identify_step(&self, state: &mut RunState) {
        debug!("identify_step: called");

        match state.plan_steps.iter().position(|s| s.status.is_pending()) {
            Some(index) => {
                state.plan_steps[index].status = StepStatus::InProgress;
                state.current_step_index = Some(index);
                let task = state.plan_steps[index].task.clone();
                info!(index, %task, "Selected next step");
                state.push_message(Message::model(format!("Executing step {}: {}", index, task)));
            }
            None => {
                debug!("identify_step: no pending steps");
                state.current_step_index = None;
            }
        }
    }

    /// execute_step: run the selected step with tools bound for its duration
    ///
    /// Any failure blocks the step and the run continues - one blocked step
    /// never halts the overall plan.
    async fn execute_step(&self, state: &mut RunState, thread_id: &str) {
        let Some(index) = state.current_step_index else {
            warn!("execute_step: no step selected");
            return;
        };

        let (task, action) = {
            let step = &state.plan_steps[index];
            (step.task.clone(), step.action.clone())
        };
        info!(index, %task, "Executing step");

        let outcome = self.execute_step_inner(index, &task, &action, thread_id).await;

        match outcome {
            Ok((turns, answer)) => {
                {
                    let step = &mut state.plan_steps[index];
                    step.trace.extend(turns.iter().cloned());
                    step.result.push_str(&answer);
                    step.status = StepStatus::Completed;
                }
                state.conversation.extend(turns);
                state.step_results.push(format!("Step {} ({}): {}", index, task, answer));
                info!(index, "Step completed");
            }
            Err(e) => {
                let diagnostic = format!("Error: could not execute step - {}", e);
                {
                    let step = &mut state.plan_steps[index];
                    step.trace.push(Message::model(diagnostic.clone()));
                    step.result.push_str(&diagnostic);
                    step.status = StepStatus::Blocked;
                }
                state.conversation.push(Message::model(diagnostic.clone()));
                state.step_results.push(format!("Step {} ({}): {}", index, task, diagnostic));
                warn!(index, error = %e, "Step blocked, continuing with the rest of the plan");
            }
        }
    }

    /// The failable part of step execution: prompt, tool session, model loop
    ///
    /// The tool session lives exactly as long as this call, released on
    /// every exit path.
    async fn execute_step_inner(
        &self,
        index: usize,
        task: &str,
        action: &str,
        thread_id: &str,
    ) -> Result<(Vec<Message>, String)> {
        let prompt = self.prompts.render(
            "step-execution",
            &json!({ "step_index": index, "task": task, "action": action }),
        )?;

        let session = ToolSession::acquire(&self.tools, format!("{}-step-{}", thread_id, index));
        let result = self.run_tool_loop(&prompt, &session).await?;
        Ok(result)
    }

    /// The model/tool loop within one step execution
    ///
    /// Returns all exchanged turns plus the model's last text answer.
    async fn run_tool_loop(
        &self,
        prompt: &str,
        session: &ToolSession<'_>,
    ) -> std::result::Result<(Vec<Message>, String), crate::llm::LlmError> {
        let tool_defs = session.definitions();
        let mut messages = vec![Message::user(prompt)];
        let mut turns = messages.clone();
        let mut final_text = String::new();

        for turn in 0..self.max_tool_turns {
            debug!(turn, "run_tool_loop: turn start");

            let request = GenerateRequest {
                system_instruction: None,
                messages: messages.clone(),
                tools: tool_defs.clone(),
                max_tokens: self.max_tokens,
                json_output: false,
            };

            let response = self.llm.generate(request).await?;

            if let Some(text) = &response.content {
                final_text = text.clone();
            }

            let model_message = build_model_message(&response);
            messages.push(model_message.clone());
            turns.push(model_message);

            match response.stop_reason {
                StopReason::ToolUse => {
                    debug!(tool_count = response.tool_calls.len(), "run_tool_loop: executing tools");
                    let results = session.execute_all(&response.tool_calls).await;
                    let result_message = build_tool_result_message(&results);
                    messages.push(result_message.clone());
                    turns.push(result_message);
                }
                StopReason::MaxTokens => {
                    debug!("run_tool_loop: truncated, asking to continue");
                    let nudge = Message::user("Continue from where you left off. Your previous response was truncated.");
                    messages.push(nudge.clone());
                    turns.push(nudge);
                }
                StopReason::EndTurn | StopReason::Safety => {
                    debug!("run_tool_loop: model finished");
                    return Ok((turns, final_text));
                }
            }
        }

        warn!(max_turns = self.max_tool_turns, "run_tool_loop: turn limit reached");
        Ok((turns, final_text))
    }

    /// finalize: summarize all step results into the structured final answer
    ///
    /// Never leaves the state without a final_summary - failures produce a
    /// placeholder with empty references.
    async fn finalize(&self, state: &mut RunState) {
        debug!("finalize: called");

        if state.final_summary.is_some() {
            debug!("finalize: summary already set, skipping");
            return;
        }

        let joined = state.step_results.join("\n\n");
        let prompt = match self.prompts.render(
            "final-summary",
            &json!({ "initial_request": state.initial_request, "step_results": joined }),
        ) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "finalize: prompt render failed");
                let text = format!("Error: could not format the summary prompt - {}", e);
                state.push_message(Message::model(text.clone()));
                state.final_summary = Some(FinalSummary {
                    text_summary: text,
                    references: Vec::new(),
                });
                return;
            }
        };

        let request = GenerateRequest {
            system_instruction: None,
            messages: vec![Message::user(prompt)],
            tools: vec![],
            max_tokens: self.max_tokens,
            json_output: false,
        };

        match self.llm.generate(request).await {
            Ok(response) => {
                let raw = response.content.unwrap_or_default();
                let summary = parse_summary(&raw);
                state.push_message(Message::model(summary.text_summary.clone()));
                info!(references = summary.references.len(), "Final summary ready");
                state.final_summary = Some(summary);
            }
            Err(e) => {
                warn!(error = %e, "finalize: generation failed");
                let text = format!("Error: could not generate the final summary - {}", e);
                state.push_message(Message::model(text.clone()));
                state.final_summary = Some(FinalSummary {
                    text_summary: text,
                    references: Vec::new(),
                });
            }
        }
    }

    // === Checkpointing ===

    async fn load_checkpoint(&self, thread_id: &str) -> Result<Option<RunState>> {
        let Some(body) = self.state.read_checkpoint(thread_id).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&body) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(%thread_id, error = %e, "Checkpoint did not parse, starting fresh");
                Ok(None)
            }
        }
    }

    async fn save_checkpoint(&self, thread_id: &str, state: &RunState) -> Result<()> {
        let body = serde_json::to_string(state)?;
        self.state.write_checkpoint(thread_id, body).await?;
        Ok(())
    }
}

/// Build the model-side message for one response
fn build_model_message(response: &GenerateResponse) -> Message {
    if response.tool_calls.is_empty() {
        return Message::model(response.content.clone().unwrap_or_default());
    }

    let mut blocks = Vec::new();
    if let Some(text) = &response.content {
        blocks.push(ContentBlock::text(text));
    }
    for call in &response.tool_calls {
        blocks.push(ContentBlock::ToolUse {
            name: call.name.clone(),
            input: call.input.clone(),
        });
    }
    Message::model_blocks(blocks)
}

/// Build the user-side message carrying tool results
fn build_tool_result_message(results: &[(String, ToolResult)]) -> Message {
    let blocks: Vec<ContentBlock> = results
        .iter()
        .map(|(name, result)| ContentBlock::tool_result(name, &result.content, result.is_error))
        .collect();
    Message::user_blocks(blocks)
}

/// Best-effort JSON snapshot of the final state for audit purposes
async fn write_state_snapshot(path: &Path, state: &RunState) {
    debug!(path = %path.display(), "write_state_snapshot: called");
    let body = match serde_json::to_string_pretty(state) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "Failed to serialize state snapshot");
            return;
        }
    };
    if let Err(e) = tokio::fs::write(path, body).await {
        warn!(path = %path.display(), error = %e, "Failed to write state snapshot");
    }
}
