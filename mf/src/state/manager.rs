//! StateManager - actor that owns the record store
//!
//! Processes commands via channels for thread-safe access to persistent
//! state. One actor per process; handles are cheap clones.

use std::path::Path;

use musestore::{Filter, Record, Store, StoreError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::{AgentResult, Chat, Idea, PlanDoc, Project};

use super::messages::{StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateManager actor
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over the store at `store_path`
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "StateManager::spawn: called");
        let mut store = Store::open(store_path.as_ref())?;

        // Rebuild indexes so filtered queries stay correct across schema
        // evolution of indexed_fields
        let projects = store.rebuild_indexes::<Project>()?;
        let ideas = store.rebuild_indexes::<Idea>()?;
        let chats = store.rebuild_indexes::<Chat>()?;
        let plans = store.rebuild_indexes::<PlanDoc>()?;
        let results = store.rebuild_indexes::<AgentResult>()?;
        info!(projects, ideas, chats, plans, results, "Rebuilt record indexes");

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));

        info!("StateManager spawned");
        Ok(Self { tx })
    }

    async fn send<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand,
    ) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Project operations ===

    pub async fn create_project(&self, project: Project) -> StateResponse<String> {
        debug!(project_id = %project.id, "create_project: called");
        self.send(|reply| StateCommand::CreateProject { project, reply }).await
    }

    pub async fn get_project(&self, id: &str, owner: &str) -> StateResponse<Option<Project>> {
        debug!(%id, %owner, "get_project: called");
        let (id, owner) = (id.to_string(), owner.to_string());
        self.send(|reply| StateCommand::GetProject { id, owner, reply }).await
    }

    pub async fn update_project(&self, project: Project) -> StateResponse<()> {
        debug!(project_id = %project.id, "update_project: called");
        self.send(|reply| StateCommand::UpdateProject { project, reply }).await
    }

    // === Idea operations ===

    pub async fn create_idea(&self, idea: Idea) -> StateResponse<String> {
        debug!(idea_id = %idea.id, "create_idea: called");
        self.send(|reply| StateCommand::CreateIdea { idea, reply }).await
    }

    pub async fn get_idea(&self, id: &str, owner: &str) -> StateResponse<Option<Idea>> {
        debug!(%id, %owner, "get_idea: called");
        let (id, owner) = (id.to_string(), owner.to_string());
        self.send(|reply| StateCommand::GetIdea { id, owner, reply }).await
    }

    pub async fn update_idea(&self, idea: Idea) -> StateResponse<()> {
        debug!(idea_id = %idea.id, "update_idea: called");
        self.send(|reply| StateCommand::UpdateIdea { idea, reply }).await
    }

    pub async fn list_ideas(&self, owner: &str, project_id: &str) -> StateResponse<Vec<Idea>> {
        debug!(%owner, %project_id, "list_ideas: called");
        let (owner, project_id) = (owner.to_string(), project_id.to_string());
        self.send(|reply| StateCommand::ListIdeas {
            owner,
            project_id,
            reply,
        })
        .await
    }

    // === Chat operations ===

    pub async fn create_chat(&self, chat: Chat) -> StateResponse<String> {
        debug!(chat_id = %chat.id, "create_chat: called");
        self.send(|reply| StateCommand::CreateChat { chat, reply }).await
    }

    pub async fn get_chat(&self, id: &str, owner: &str) -> StateResponse<Option<Chat>> {
        debug!(%id, %owner, "get_chat: called");
        let (id, owner) = (id.to_string(), owner.to_string());
        self.send(|reply| StateCommand::GetChat { id, owner, reply }).await
    }

    pub async fn update_chat(&self, chat: Chat) -> StateResponse<()> {
        debug!(chat_id = %chat.id, "update_chat: called");
        self.send(|reply| StateCommand::UpdateChat { chat, reply }).await
    }

    // === Plan document operations ===

    pub async fn create_plan_doc(&self, plan: PlanDoc) -> StateResponse<String> {
        debug!(plan_id = %plan.id, "create_plan_doc: called");
        self.send(|reply| StateCommand::CreatePlanDoc { plan, reply }).await
    }

    pub async fn get_plan_doc(&self, id: &str, owner: &str) -> StateResponse<Option<PlanDoc>> {
        debug!(%id, %owner, "get_plan_doc: called");
        let (id, owner) = (id.to_string(), owner.to_string());
        self.send(|reply| StateCommand::GetPlanDoc { id, owner, reply }).await
    }

    pub async fn update_plan_doc(&self, plan: PlanDoc) -> StateResponse<()> {
        debug!(plan_id = %plan.id, "update_plan_doc: called");
        self.send(|reply| StateCommand::UpdatePlanDoc { plan, reply }).await
    }

    // === Agent result operations ===

    pub async fn create_agent_result(&self, result: AgentResult) -> StateResponse<String> {
        debug!(result_id = %result.id, "create_agent_result: called");
        self.send(|reply| StateCommand::CreateAgentResult { result, reply }).await
    }

    pub async fn get_agent_result(&self, id: &str, owner: &str) -> StateResponse<Option<AgentResult>> {
        debug!(%id, %owner, "get_agent_result: called");
        let (id, owner) = (id.to_string(), owner.to_string());
        self.send(|reply| StateCommand::GetAgentResult { id, owner, reply }).await
    }

    pub async fn update_agent_result(&self, result: AgentResult) -> StateResponse<()> {
        debug!(result_id = %result.id, "update_agent_result: called");
        self.send(|reply| StateCommand::UpdateAgentResult { result, reply }).await
    }

    // === Workflow checkpoint operations ===

    pub async fn write_checkpoint(&self, thread_id: &str, body: String) -> StateResponse<()> {
        debug!(%thread_id, "write_checkpoint: called");
        let thread_id = thread_id.to_string();
        self.send(|reply| StateCommand::WriteCheckpoint {
            thread_id,
            body,
            reply,
        })
        .await
    }

    pub async fn read_checkpoint(&self, thread_id: &str) -> StateResponse<Option<String>> {
        debug!(%thread_id, "read_checkpoint: called");
        let thread_id = thread_id.to_string();
        self.send(|reply| StateCommand::ReadCheckpoint { thread_id, reply }).await
    }

    /// Ask the actor to shut down once queued commands drain
    pub async fn shutdown(&self) {
        debug!("shutdown: called");
        let _ = self.tx.send(StateCommand::Shutdown).await;
    }
}

/// Records that carry an owner identity
trait Owned {
    fn owner(&self) -> &str;
}

macro_rules! impl_owned {
    ($($ty:ty),*) => {
        $(impl Owned for $ty {
            fn owner(&self) -> &str {
                &self.owner
            }
        })*
    };
}

impl_owned!(Project, Idea, Chat, PlanDoc, AgentResult);

fn map_store_err(err: StoreError) -> StateError {
    match err {
        StoreError::NotFound(what) => StateError::NotFound(what),
        other => StateError::StoreError(other.to_string()),
    }
}

/// Fetch a record and verify ownership
///
/// A record owned by someone else is reported as absent - callers cannot
/// distinguish "missing" from "not yours".
fn get_owned<R: Record + Owned>(store: &Store, id: &str, owner: &str) -> StateResponse<Option<R>> {
    match store.get::<R>(id) {
        Ok(Some(record)) if record.owner() == owner => Ok(Some(record)),
        Ok(_) => Ok(None),
        Err(e) => Err(map_store_err(e)),
    }
}

fn create_record<R: Record>(store: &mut Store, record: &R) -> StateResponse<String> {
    store.create(record).map_err(map_store_err)
}

fn update_record<R: Record>(store: &mut Store, record: &R) -> StateResponse<()> {
    store.update(record).map_err(map_store_err)
}

/// The actor: owns the store, drains the command channel
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("actor_loop: started");
    while let Some(command) = rx.recv().await {
        match command {
            StateCommand::CreateProject { project, reply } => {
                let _ = reply.send(create_record(&mut store, &project));
            }
            StateCommand::GetProject { id, owner, reply } => {
                let _ = reply.send(get_owned::<Project>(&store, &id, &owner));
            }
            StateCommand::UpdateProject { project, reply } => {
                let _ = reply.send(update_record(&mut store, &project));
            }
            StateCommand::CreateIdea { idea, reply } => {
                let _ = reply.send(create_record(&mut store, &idea));
            }
            StateCommand::GetIdea { id, owner, reply } => {
                let _ = reply.send(get_owned::<Idea>(&store, &id, &owner));
            }
            StateCommand::UpdateIdea { idea, reply } => {
                let _ = reply.send(update_record(&mut store, &idea));
            }
            StateCommand::ListIdeas {
                owner,
                project_id,
                reply,
            } => {
                let filters = [Filter::eq("owner", owner.as_str()), Filter::eq("project", project_id.as_str())];
                let _ = reply.send(store.list::<Idea>(&filters).map_err(map_store_err));
            }
            StateCommand::CreateChat { chat, reply } => {
                let _ = reply.send(create_record(&mut store, &chat));
            }
            StateCommand::GetChat { id, owner, reply } => {
                let _ = reply.send(get_owned::<Chat>(&store, &id, &owner));
            }
            StateCommand::UpdateChat { chat, reply } => {
                let _ = reply.send(update_record(&mut store, &chat));
            }
            StateCommand::CreatePlanDoc { plan, reply } => {
                let _ = reply.send(create_record(&mut store, &plan));
            }
            StateCommand::GetPlanDoc { id, owner, reply } => {
                let _ = reply.send(get_owned::<PlanDoc>(&store, &id, &owner));
            }
            StateCommand::UpdatePlanDoc { plan, reply } => {
                let _ = reply.send(update_record(&mut store, &plan));
            }
            StateCommand::CreateAgentResult { result, reply } => {
                let _ = reply.send(create_record(&mut store, &result));
            }
            StateCommand::GetAgentResult { id, owner, reply } => {
                let _ = reply.send(get_owned::<AgentResult>(&store, &id, &owner));
            }
            StateCommand::UpdateAgentResult { result, reply } => {
                let _ = reply.send(update_record(&mut store, &result));
            }
            StateCommand::WriteCheckpoint { thread_id, body, reply } => {
                let _ = reply.send(store.write_checkpoint(&thread_id, &body).map_err(map_store_err));
            }
            StateCommand::ReadCheckpoint { thread_id, reply } => {
                let _ = reply.send(store.read_checkpoint(&thread_id).map_err(map_store_err));
            }
            StateCommand::Shutdown => {
                info!("StateManager actor shutting down");
                break;
            }
        }
    }
    debug!("actor_loop: exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_project_roundtrip() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let project = Project::new("user-1", "Music Video", None);
        let id = state.create_project(project.clone()).await.unwrap();
        assert_eq!(id, project.id);

        let loaded = state.get_project(&id, "user-1").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Music Video");
    }

    #[tokio::test]
    async fn test_owner_isolation() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let project = Project::new("user-1", "Secret", None);
        let id = state.create_project(project).await.unwrap();

        // Someone else's record reads as absent
        let other = state.get_project(&id, "user-2").await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_list_ideas_filters_by_project() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        state
            .create_idea(Idea::new("user-1", "project-a", "one", "c1"))
            .await
            .unwrap();
        state
            .create_idea(Idea::new("user-1", "project-b", "two", "c2"))
            .await
            .unwrap();
        state
            .create_idea(Idea::new("user-2", "project-a", "three", "c3"))
            .await
            .unwrap();

        let ideas = state.list_ideas("user-1", "project-a").await.unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].title, "one");
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let chat = Chat::new("user-1", "project-a");
        let err = state.update_chat(chat).await.unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_checkpoint_passthrough() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        assert!(state.read_checkpoint("t-1").await.unwrap().is_none());
        state.write_checkpoint("t-1", "{\"node\":\"done\"}".to_string()).await.unwrap();
        let body = state.read_checkpoint("t-1").await.unwrap().unwrap();
        assert!(body.contains("done"));
    }
}
