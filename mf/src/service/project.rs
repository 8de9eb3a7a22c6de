//! ProjectService - projects, plan documents, and agent-backed idea search

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::agent::{FinalSummary, RunInput, WorkflowEngine};
use crate::domain::{AgentResult, PlanDoc, Project, new_thread_id};
use crate::llm::{GenerateRequest, LlmClient, LlmError, Message};
use crate::prompts::PromptLoader;
use crate::state::StateManager;

use super::ServiceError;

/// Outcome of an agent-backed idea search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Record the result was persisted under (new or appended-to)
    pub agent_result_id: String,

    /// The structured summary returned to the caller
    pub summary: FinalSummary,
}

/// Project-level operations
pub struct ProjectService {
    llm: Arc<dyn LlmClient>,
    state: StateManager,
    engine: Arc<WorkflowEngine>,
    prompts: PromptLoader,
    max_tokens: u32,
}

impl ProjectService {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        state: StateManager,
        engine: Arc<WorkflowEngine>,
        prompts: PromptLoader,
        max_tokens: u32,
    ) -> Self {
        debug!("ProjectService::new: called");
        Self {
            llm,
            state,
            engine,
            prompts,
            max_tokens,
        }
    }

    /// Create a new project
    pub async fn create_project(
        &self,
        owner: &str,
        title: &str,
        description: Option<String>,
    ) -> Result<Project, ServiceError> {
        info!(%owner, %title, "create_project: called");
        let project = Project::new(owner, title, description);
        self.state.create_project(project.clone()).await?;
        Ok(project)
    }

    /// Bump a project's last-accessed timestamp (best-effort)
    pub async fn touch_project(&self, owner: &str, project_id: &str) {
        debug!(%owner, %project_id, "touch_project: called");
        match self.state.get_project(project_id, owner).await {
            Ok(Some(mut project)) => {
                project.touch();
                if let Err(e) = self.state.update_project(project).await {
                    warn!(%project_id, error = %e, "touch_project: update failed");
                }
            }
            Ok(None) => warn!(%project_id, "touch_project: project not found"),
            Err(e) => warn!(%project_id, error = %e, "touch_project: lookup failed"),
        }
    }

    /// Ask the model for a plan document built from the project's ideas
    ///
    /// The model is asked for structured JSON output but the parse stays
    /// tolerant of fenced wrapping.
    pub async fn recommend_plan(&self, owner: &str, project_id: &str) -> Result<PlanDoc, ServiceError> {
        info!(%owner, %project_id, "recommend_plan: called");

        let ideas = self.state.list_ideas(owner, project_id).await?;
        if ideas.is_empty() {
            warn!(%project_id, "recommend_plan: no ideas recorded, recommending from an empty set");
        }
        let combined: String = ideas
            .iter()
            .map(|i| i.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let system = self
            .prompts
            .render("plan-recommendation", &json!({}))
            .map_err(|e| ServiceError::Workflow(e.to_string()))?;

        let request = GenerateRequest {
            system_instruction: Some(system),
            messages: vec![Message::user(combined)],
            tools: vec![],
            max_tokens: self.max_tokens,
            json_output: true,
        };

        let response = self.llm.generate(request).await?;
        let raw = response
            .content
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("Empty plan recommendation response".to_string()))?;

        let doc = parse_plan_document(&raw)
            .ok_or_else(|| ServiceError::Workflow("Plan response did not contain a JSON document".to_string()))?;

        let title = doc
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled plan")
            .to_string();
        let contents = match doc.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| raw.clone()),
            None => raw.clone(),
        };

        let mut plan = PlanDoc::new(owner, project_id, title, contents).mark_ai();
        if let Some(description) = doc.get("description").and_then(Value::as_str) {
            plan = plan.with_description(description);
        }

        self.state.create_plan_doc(plan.clone()).await?;
        info!(plan_id = %plan.id, "recommend_plan: plan persisted");
        Ok(plan)
    }

    /// Rewrite a plan document through the model and store the result
    pub async fn organize_plan(
        &self,
        owner: &str,
        project_id: &str,
        plan_id: &str,
    ) -> Result<PlanDoc, ServiceError> {
        info!(%owner, %project_id, %plan_id, "organize_plan: called");

        let mut plan = self
            .state
            .get_plan_doc(plan_id, owner)
            .await?
            .filter(|p| p.project_id == project_id)
            .ok_or_else(|| ServiceError::NotFound(format!("plan {}", plan_id)))?;

        if plan.contents.trim().is_empty() {
            return Err(ServiceError::NotFound(format!("plan {} has no contents", plan_id)));
        }

        let system = self
            .prompts
            .render("plan-organization", &json!({}))
            .map_err(|e| ServiceError::Workflow(e.to_string()))?;

        let request = GenerateRequest {
            system_instruction: Some(system),
            messages: vec![Message::user(plan.contents.clone())],
            tools: vec![],
            max_tokens: self.max_tokens,
            json_output: false,
        };

        let response = self.llm.generate(request).await?;
        let organized = response
            .content
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("Empty plan organization response".to_string()))?;

        plan.set_contents(organized);
        self.state.update_plan_doc(plan.clone()).await?;
        info!(plan_id = %plan.id, "organize_plan: plan updated");
        Ok(plan)
    }

    /// Run the research agent for a prompt and persist the structured result
    ///
    /// A fresh continuation id is minted per call; pass `agent_result_id` to
    /// append to an existing result record instead of creating a new one.
    pub async fn search_ideas(
        &self,
        owner: &str,
        project_id: &str,
        prompt: &str,
        agent_result_id: Option<&str>,
    ) -> Result<SearchOutcome, ServiceError> {
        info!(%owner, %project_id, "search_ideas: called");

        let thread_id = new_thread_id();
        let final_state = self
            .engine
            .run(RunInput::from_request(prompt), &thread_id)
            .await
            .map_err(|e| ServiceError::Workflow(e.to_string()))?;

        let summary = final_state.final_summary.clone().unwrap_or_else(|| {
            // Unreachable by the engine's contract, kept as a defensive
            // fallback mirroring the caller-side recovery the API needs
            warn!(%thread_id, "search_ideas: terminal state without summary");
            let text = final_state
                .conversation
                .iter()
                .rev()
                .find_map(|m| m.as_text())
                .unwrap_or("The search produced no usable summary.")
                .to_string();
            FinalSummary {
                text_summary: text,
                references: Vec::new(),
            }
        });

        let payload =
            serde_json::to_string(&summary).map_err(|e| ServiceError::Workflow(e.to_string()))?;

        let agent_result_id = match agent_result_id {
            None => {
                let title = if prompt.is_empty() { "Search results" } else { prompt };
                let mut record = AgentResult::new(owner, project_id, title, "search");
                record.append_pair(prompt, &payload);
                self.state.create_agent_result(record.clone()).await?;
                debug!(result_id = %record.id, "search_ideas: created result record");
                record.id
            }
            Some(id) => {
                let mut record = self
                    .state
                    .get_agent_result(id, owner)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("agent result {}", id)))?;
                record.append_pair(prompt, &payload);
                self.state.update_agent_result(record).await?;
                debug!(result_id = %id, "search_ideas: appended to result record");
                id.to_string()
            }
        };

        Ok(SearchOutcome {
            agent_result_id,
            summary,
        })
    }
}

/// Pull a JSON object out of a model response, fenced or bare
fn parse_plan_document(raw: &str) -> Option<Value> {
    let candidate = match raw.find("```json") {
        Some(start) => {
            let inner_start = start + "```json".len();
            let end = raw[inner_start..].find("```")?;
            raw[inner_start..inner_start + end].trim()
        }
        None => raw.trim(),
    };
    let value: Value = serde_json::from_str(candidate).ok()?;
    value.is_object().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::domain::Idea;
    use crate::llm::GenerateResponse;
    use crate::llm::client::mock::MockLlmClient;
    use crate::tools::ToolExecutor;
    use tempfile::tempdir;

    const PLAN_ONE_STEP: &str = "```json\n[{\"plan_sequence\":1,\"task\":\"only step\",\"action\":\"do it\"}]\n```";
    const SUMMARY_WITH_REFS: &str = "Answer body\nReferences\n```json\n[{\"title\":\"X\",\"description\":\"Y\",\"url\":\"Z\",\"type\":\"webpage\"}]\n```";

    fn service(responses: Vec<GenerateResponse>, state: &StateManager) -> ProjectService {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(responses));
        let engine = Arc::new(WorkflowEngine::new(
            llm.clone(),
            Arc::new(ToolExecutor::empty()),
            state.clone(),
            PromptLoader::default(),
            &AgentConfig::default(),
            1024,
        ));
        ProjectService::new(llm, state.clone(), engine, PromptLoader::default(), 1024)
    }

    #[tokio::test]
    async fn test_create_and_touch_project() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();
        let svc = service(vec![], &state);

        let project = svc.create_project("user-1", "Film", None).await.unwrap();
        svc.touch_project("user-1", &project.id).await;

        let loaded = state.get_project(&project.id, "user-1").await.unwrap().unwrap();
        assert!(loaded.last_accessed_at >= project.last_accessed_at);
    }

    #[tokio::test]
    async fn test_recommend_plan_persists_document() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        state
            .create_idea(Idea::new("user-1", "project-1", "idea", "neon nights"))
            .await
            .unwrap();

        let response = "```json\n{\"title\":\"Neon plan\",\"description\":\"d\",\"content\":\"# Body\"}\n```";
        let svc = service(vec![GenerateResponse::from_text(response)], &state);

        let plan = svc.recommend_plan("user-1", "project-1").await.unwrap();
        assert_eq!(plan.title, "Neon plan");
        assert_eq!(plan.contents, "# Body");
        assert!(plan.is_ai);

        let loaded = state.get_plan_doc(&plan.id, "user-1").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Neon plan");
    }

    #[tokio::test]
    async fn test_recommend_plan_rejects_non_json() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let svc = service(vec![GenerateResponse::from_text("no json here")], &state);
        let err = svc.recommend_plan("user-1", "project-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Workflow(_)));
    }

    #[tokio::test]
    async fn test_organize_plan_updates_contents() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let plan = PlanDoc::new("user-1", "project-1", "Plan", "messy body");
        let plan_id = state.create_plan_doc(plan).await.unwrap();

        let svc = service(vec![GenerateResponse::from_text("# Organized")], &state);
        let updated = svc.organize_plan("user-1", "project-1", &plan_id).await.unwrap();
        assert_eq!(updated.contents, "# Organized");

        let loaded = state.get_plan_doc(&plan_id, "user-1").await.unwrap().unwrap();
        assert_eq!(loaded.contents, "# Organized");
    }

    #[tokio::test]
    async fn test_organize_missing_plan_is_not_found() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();
        let svc = service(vec![], &state);

        let err = svc.organize_plan("user-1", "project-1", "ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_ideas_creates_result_record() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let svc = service(
            vec![
                GenerateResponse::from_text(PLAN_ONE_STEP),
                GenerateResponse::from_text("findings"),
                GenerateResponse::from_text(SUMMARY_WITH_REFS),
            ],
            &state,
        );

        let outcome = svc
            .search_ideas("user-1", "project-1", "find sad songs", None)
            .await
            .unwrap();

        assert_eq!(outcome.summary.text_summary, "Answer body");
        assert_eq!(outcome.summary.references.len(), 1);

        let record = state
            .get_agent_result(&outcome.agent_result_id, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.kind, "search");
        assert_eq!(record.messages.len(), 2);
        assert!(record.messages[1].content.contains("Answer body"));
    }

    #[tokio::test]
    async fn test_search_ideas_appends_to_existing_record() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let mut existing = AgentResult::new("user-1", "project-1", "earlier", "search");
        existing.append_pair("old prompt", "old answer");
        let existing_id = state.create_agent_result(existing).await.unwrap();

        let svc = service(
            vec![
                GenerateResponse::from_text(PLAN_ONE_STEP),
                GenerateResponse::from_text("findings"),
                GenerateResponse::from_text("bare summary"),
            ],
            &state,
        );

        let outcome = svc
            .search_ideas("user-1", "project-1", "follow-up", Some(&existing_id))
            .await
            .unwrap();
        assert_eq!(outcome.agent_result_id, existing_id);

        let record = state.get_agent_result(&existing_id, "user-1").await.unwrap().unwrap();
        assert_eq!(record.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_search_ideas_run_reaches_terminal_state() {
        // Even with the execution step failing, the service still gets a
        // structured summary back
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::with_outcomes(vec![
            crate::llm::client::mock::MockOutcome::Respond(GenerateResponse::from_text(PLAN_ONE_STEP)),
            crate::llm::client::mock::MockOutcome::Fail("down".to_string()),
            crate::llm::client::mock::MockOutcome::Respond(GenerateResponse::from_text("degraded summary")),
        ]));
        let engine = Arc::new(WorkflowEngine::new(
            llm.clone(),
            Arc::new(ToolExecutor::empty()),
            state.clone(),
            PromptLoader::default(),
            &AgentConfig::default(),
            1024,
        ));
        let svc = ProjectService::new(llm, state.clone(), engine, PromptLoader::default(), 1024);

        let outcome = svc
            .search_ideas("user-1", "project-1", "anything", None)
            .await
            .unwrap();
        assert_eq!(outcome.summary.text_summary, "degraded summary");
    }

    #[test]
    fn test_parse_plan_document_variants() {
        assert!(parse_plan_document("```json\n{\"title\":\"t\"}\n```").is_some());
        assert!(parse_plan_document("{\"title\":\"t\"}").is_some());
        assert!(parse_plan_document("[1,2,3]").is_none());
        assert!(parse_plan_document("prose").is_none());
    }
}
