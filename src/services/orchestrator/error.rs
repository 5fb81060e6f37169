//! Orchestrator Errors
//!
//! Plumbing failures around a session task. Orchestration outcomes, including
//! failed sessions, are always delivered as a `Report`; an unusable
//! configuration is rejected by `start_session` with a `CoreError`.

/// Errors from awaiting a session task
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Session task panicked: {0}")]
    SessionPanicked(String),

    #[error("Session task aborted")]
    SessionAborted,
}

impl From<tokio::task::JoinError> for OrchestratorError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            OrchestratorError::SessionPanicked(err.to_string())
        } else {
            OrchestratorError::SessionAborted
        }
    }
}
