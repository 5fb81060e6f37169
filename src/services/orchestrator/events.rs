//! Session Events & Status
//!
//! Progress notifications published while a session runs, and the live status
//! readable through a `SessionHandle`. Events are best-effort: a session never
//! waits on a slow subscriber, so a full channel drops them.

use serde::{Deserialize, Serialize};

use oncall_rca_core::{SessionState, TerminationReason};

/// Events emitted during a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Session task started
    Started { session_id: String, ticket_id: String },
    /// State machine moved between states
    Transition {
        session_id: String,
        from: SessionState,
        to: SessionState,
        iteration: u32,
    },
    /// A gather step finished
    EvidenceGathered {
        session_id: String,
        returned: usize,
        added: usize,
        failed: usize,
        total_failure: bool,
    },
    /// The reasoner produced an analysis
    AnalysisProduced {
        session_id: String,
        iteration: u32,
        complete: bool,
        confidence: f32,
    },
    /// The reviewer answered
    Reviewed { session_id: String, approved: bool },
    /// Session reached a terminal state
    Finished {
        session_id: String,
        final_state: SessionState,
        termination_reason: TerminationReason,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::Started { session_id, .. }
            | SessionEvent::Transition { session_id, .. }
            | SessionEvent::EvidenceGathered { session_id, .. }
            | SessionEvent::AnalysisProduced { session_id, .. }
            | SessionEvent::Reviewed { session_id, .. }
            | SessionEvent::Finished { session_id, .. } => session_id,
        }
    }
}

/// Live view of a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub iteration: u32,
    pub fragments: usize,
    pub revisions: u32,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: SessionState::Init,
            iteration: 0,
            fragments: 0,
            revisions: 0,
        }
    }
}
