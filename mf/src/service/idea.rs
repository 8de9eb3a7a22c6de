//! IdeaService - brainstorming chats and idea reports

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::Chat;
use crate::llm::{GenerateRequest, LlmClient, Message, StreamChunk};
use crate::prompts::PromptLoader;
use crate::state::StateManager;

use super::ServiceError;

/// Brainstorming support: a streaming idea coach plus report generation
pub struct IdeaService {
    llm: Arc<dyn LlmClient>,
    state: StateManager,
    prompts: PromptLoader,
    max_tokens: u32,
}

impl IdeaService {
    pub fn new(llm: Arc<dyn LlmClient>, state: StateManager, prompts: PromptLoader, max_tokens: u32) -> Self {
        debug!("IdeaService::new: called");
        Self {
            llm,
            state,
            prompts,
            max_tokens,
        }
    }

    /// Stream a coaching response for one brainstorming turn
    ///
    /// Chunks flow to `chunk_tx` as they arrive; when the stream completes
    /// the user/assistant pair is appended to the chat record. Referenced
    /// ideas that fail to load are skipped with a warning, not fatal.
    pub async fn brainstorm_stream(
        &self,
        owner: &str,
        chat_id: &str,
        prompt_text: &str,
        referenced_idea_ids: &[String],
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<String, ServiceError> {
        info!(%owner, %chat_id, "brainstorm_stream: called");

        let mut chat = self
            .state
            .get_chat(chat_id, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("chat {}", chat_id)))?;

        let mut messages = history_messages(&chat);
        self.push_referenced_ideas(owner, referenced_idea_ids, &mut messages).await;
        messages.push(Message::user(prompt_text));

        let system = self
            .prompts
            .render("idea-coach", &json!({}))
            .map_err(|e| ServiceError::Workflow(e.to_string()))?;

        let request = GenerateRequest {
            system_instruction: Some(system),
            messages,
            tools: vec![],
            max_tokens: self.max_tokens,
            json_output: false,
        };

        let response = self.llm.stream(request, chunk_tx).await?;
        let full_response = response.content.unwrap_or_default();
        info!(response_len = full_response.len(), "brainstorm_stream: stream complete");

        chat.append_pair(prompt_text, &full_response);
        self.state.update_chat(chat).await?;

        Ok(full_response)
    }

    /// Generate an inspiration report from a chat and write it back
    ///
    /// The report lands on each referenced idea (`ai_report`) and on the
    /// chat's `summary`.
    pub async fn create_report(
        &self,
        owner: &str,
        chat_id: &str,
        prompt_text: &str,
        referenced_idea_ids: &[String],
    ) -> Result<String, ServiceError> {
        info!(%owner, %chat_id, "create_report: called");

        let mut chat = self
            .state
            .get_chat(chat_id, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("chat {}", chat_id)))?;

        let mut messages = history_messages(&chat);
        let request_text = if prompt_text.is_empty() {
            "Write the report from the conversation so far."
        } else {
            prompt_text
        };
        messages.push(Message::user(request_text));

        let system = self
            .prompts
            .render("idea-report", &json!({}))
            .map_err(|e| ServiceError::Workflow(e.to_string()))?;

        let request = GenerateRequest {
            system_instruction: Some(system),
            messages,
            tools: vec![],
            max_tokens: self.max_tokens,
            json_output: false,
        };

        let response = self.llm.generate(request).await?;
        let report = response.content.unwrap_or_default();

        for idea_id in referenced_idea_ids {
            match self.state.get_idea(idea_id, owner).await {
                Ok(Some(mut idea)) => {
                    idea.set_report(report.clone());
                    self.state.update_idea(idea).await?;
                    debug!(%idea_id, "create_report: report attached to idea");
                }
                Ok(None) => warn!(%idea_id, "create_report: referenced idea not found"),
                Err(e) => warn!(%idea_id, error = %e, "create_report: failed to load referenced idea"),
            }
        }

        chat.summary = Some(report.clone());
        self.state.update_chat(chat).await?;

        info!(report_len = report.len(), "create_report: done");
        Ok(report)
    }

    /// Load referenced ideas into context messages, skipping failures
    async fn push_referenced_ideas(&self, owner: &str, idea_ids: &[String], messages: &mut Vec<Message>) {
        for idea_id in idea_ids {
            match self.state.get_idea(idea_id, owner).await {
                Ok(Some(idea)) => {
                    debug!(%idea_id, "push_referenced_ideas: adding idea context");
                    messages.push(Message::user(format!(
                        "Reference idea '{}':\n{}",
                        idea.title, idea.content
                    )));
                }
                Ok(None) => warn!(%idea_id, "push_referenced_ideas: idea not found"),
                Err(e) => warn!(%idea_id, error = %e, "push_referenced_ideas: failed to load idea"),
            }
        }
    }
}

/// Map stored chat history onto model messages
///
/// Stored roles are "user"/"assistant"; anything else (system notes, legacy
/// rows) is skipped, matching what the gateway can represent.
fn history_messages(chat: &Chat) -> Vec<Message> {
    chat.messages
        .iter()
        .filter_map(|m| match m.role.as_str() {
            "user" => Some(Message::user(m.content.clone())),
            "assistant" => Some(Message::model(m.content.clone())),
            _ => None,
        })
        .collect()
}
