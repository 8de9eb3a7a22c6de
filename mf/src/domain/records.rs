//! Domain record types persisted through the state manager
//!
//! All records carry an `owner` (user identity) and are indexed on it;
//! reads through the state manager verify ownership.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use musestore::{IndexValue, Record, now_ms};

use super::id::generate_id;

/// A creative project grouping ideas, chats, and plans
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: Option<String>,

    /// Last time the owner opened this project (Unix milliseconds)
    pub last_accessed_at: i64,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Project {
    pub fn new(owner: impl Into<String>, title: impl Into<String>, description: Option<String>) -> Self {
        let title = title.into();
        let now = now_ms();
        Self {
            id: generate_id("project", &title),
            owner: owner.into(),
            title,
            description,
            last_accessed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record an access, bumping the timestamps
    pub fn touch(&mut self) {
        let now = now_ms();
        self.last_accessed_at = now;
        self.updated_at = now;
    }
}

impl Record for Project {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "projects"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("owner".to_string(), IndexValue::String(self.owner.clone()));
        fields
    }
}

/// A captured idea inside a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub owner: String,
    pub project_id: String,
    pub title: String,
    pub content: String,

    /// Generated inspiration report, if one has been written back
    pub ai_report: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Idea {
    pub fn new(
        owner: impl Into<String>,
        project_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let now = now_ms();
        Self {
            id: generate_id("idea", &title),
            owner: owner.into(),
            project_id: project_id.into(),
            title,
            content: content.into(),
            ai_report: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a generated report
    pub fn set_report(&mut self, report: impl Into<String>) {
        self.ai_report = Some(report.into());
        self.updated_at = now_ms();
    }
}

impl Record for Idea {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "ideas"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("owner".to_string(), IndexValue::String(self.owner.clone()));
        fields.insert("project".to_string(), IndexValue::String(self.project_id.clone()));
        fields
    }
}

/// One stored message in a chat or result history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A brainstorming chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub owner: String,
    pub project_id: String,
    pub messages: Vec<ChatMessage>,

    /// Generated session summary/report, if any
    pub summary: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Chat {
    pub fn new(owner: impl Into<String>, project_id: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: generate_id("chat", "session"),
            owner: owner.into(),
            project_id: project_id.into(),
            messages: Vec::new(),
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append one user/assistant exchange
    pub fn append_pair(&mut self, user_content: impl Into<String>, assistant_content: impl Into<String>) {
        self.messages.push(ChatMessage::user(user_content));
        self.messages.push(ChatMessage::assistant(assistant_content));
        self.updated_at = now_ms();
    }
}

impl Record for Chat {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "chats"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("owner".to_string(), IndexValue::String(self.owner.clone()));
        fields.insert("project".to_string(), IndexValue::String(self.project_id.clone()));
        fields
    }
}

/// An AI-recommended plan document for a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDoc {
    pub id: String,
    pub owner: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,

    /// Markdown plan body
    pub contents: String,

    /// Whether the document was model-generated
    pub is_ai: bool,

    pub created_at: i64,
    pub updated_at: i64,
}

impl PlanDoc {
    pub fn new(
        owner: impl Into<String>,
        project_id: impl Into<String>,
        title: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let now = now_ms();
        Self {
            id: generate_id("plan", &title),
            owner: owner.into(),
            project_id: project_id.into(),
            title,
            description: None,
            contents: contents.into(),
            is_ai: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn mark_ai(mut self) -> Self {
        self.is_ai = true;
        self
    }

    /// Replace the plan body
    pub fn set_contents(&mut self, contents: impl Into<String>) {
        self.contents = contents.into();
        self.updated_at = now_ms();
    }
}

impl Record for PlanDoc {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "plans"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("owner".to_string(), IndexValue::String(self.owner.clone()));
        fields.insert("project".to_string(), IndexValue::String(self.project_id.clone()));
        fields
    }
}

/// Persisted output of one agent run (search results and follow-ups)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub id: String,
    pub owner: String,
    pub project_id: String,
    pub title: String,

    /// Result kind, e.g. "search"
    pub kind: String,

    /// Prompt/answer exchange history, append-only
    pub messages: Vec<ChatMessage>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl AgentResult {
    pub fn new(
        owner: impl Into<String>,
        project_id: impl Into<String>,
        title: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let now = now_ms();
        Self {
            id: generate_id("result", &title),
            owner: owner.into(),
            project_id: project_id.into(),
            title,
            kind: kind.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append one prompt/answer exchange
    pub fn append_pair(&mut self, user_content: impl Into<String>, assistant_content: impl Into<String>) {
        self.messages.push(ChatMessage::user(user_content));
        self.messages.push(ChatMessage::assistant(assistant_content));
        self.updated_at = now_ms();
    }
}

impl Record for AgentResult {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "agent_results"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("owner".to_string(), IndexValue::String(self.owner.clone()));
        fields.insert("project".to_string(), IndexValue::String(self.project_id.clone()));
        fields.insert("kind".to_string(), IndexValue::String(self.kind.clone()));
        fields
    }
}
