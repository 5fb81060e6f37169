//! Session Handle
//!
//! Caller-side view of a session running on its own task.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use oncall_rca_core::Report;

use super::error::OrchestratorError;
use super::events::SessionStatus;

/// Handle to a spawned session.
pub struct SessionHandle {
    id: String,
    status: Arc<RwLock<SessionStatus>>,
    cancellation_token: CancellationToken,
    task: JoinHandle<Report>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: String,
        status: Arc<RwLock<SessionStatus>>,
        cancellation_token: CancellationToken,
        task: JoinHandle<Report>,
    ) -> Self {
        Self {
            id,
            status,
            cancellation_token,
            task,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state, iteration, fragment count and revisions.
    pub async fn status(&self) -> SessionStatus {
        self.status.read().await.clone()
    }

    /// Request cooperative cancellation. The session stops before its next
    /// transition, or as soon as the capability call in flight is dropped.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    /// Token that cancels this session.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Whether the session task has returned.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal report.
    pub async fn wait(self) -> Result<Report, OrchestratorError> {
        Ok(self.task.await?)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
