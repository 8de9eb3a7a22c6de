//! ToolContext - execution context for tools

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// Execution context for tools - scoped to one tool session
///
/// Carries the session identity for log correlation and counts invocations
/// so the session can report how much tool traffic a step generated.
#[derive(Clone)]
pub struct ToolContext {
    /// Session id (one per execute_step call)
    pub session_id: String,

    /// Number of tool invocations made in this session
    invocations: Arc<AtomicU32>,
}

impl ToolContext {
    /// Create a new tool context
    pub fn new(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        debug!(%session_id, "ToolContext::new: called");
        Self {
            session_id,
            invocations: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Record one tool invocation
    pub fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of tool invocations made so far
    pub fn invocation_count(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}
