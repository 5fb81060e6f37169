//! Session States & Final Report
//!
//! The orchestration state machine's states and the terminal `Report` a
//! caller receives. `TerminationReason` is the honesty contract: a caller can
//! tell a reviewed, approved analysis from a degraded one without inspecting
//! anything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;
use crate::evidence::EvidenceSnapshot;

// ============================================================================
// SessionState
// ============================================================================

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    Gathering,
    Reasoning,
    Reviewing,
    Revising,
    Done,
    Failed,
}

impl SessionState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Init => write!(f, "init"),
            SessionState::Gathering => write!(f, "gathering"),
            SessionState::Reasoning => write!(f, "reasoning"),
            SessionState::Reviewing => write!(f, "reviewing"),
            SessionState::Revising => write!(f, "revising"),
            SessionState::Done => write!(f, "done"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// TerminationReason / Degradation
// ============================================================================

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Reasoner converged and the reviewer approved
    Approved,
    /// A budget cap forced completion; the analysis is degraded
    BudgetExhausted,
    /// Every search provider kept failing
    EvidenceUnavailable,
    /// The reasoner or reviewer itself errored
    CapabilityFailure,
    /// The caller cancelled the session
    Cancelled,
}

impl TerminationReason {
    /// Only `Approved` is a fully trustworthy result.
    pub fn is_approved(&self) -> bool {
        matches!(self, TerminationReason::Approved)
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Approved => write!(f, "approved"),
            TerminationReason::BudgetExhausted => write!(f, "budget_exhausted"),
            TerminationReason::EvidenceUnavailable => write!(f, "evidence_unavailable"),
            TerminationReason::CapabilityFailure => write!(f, "capability_failure"),
            TerminationReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How a `Done` result falls short of a reviewed, converged analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The reviewer never approved this analysis
    UnreviewedBestEffort,
    /// The reasoner still wanted more evidence when the budget ran out
    InsufficientEvidence,
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degradation::UnreviewedBestEffort => write!(f, "unreviewed/best-effort"),
            Degradation::InsufficientEvidence => write!(f, "insufficient-evidence"),
        }
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Gatherer,
    Reasoner,
    Reviewer,
}

/// One line of the investigation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub iteration: u32,
    pub source: TranscriptSource,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(iteration: u32, source: TranscriptSource, message: impl Into<String>) -> Self {
        Self {
            iteration,
            source,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Counters collected over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Reasoning passes performed
    pub iterations: u32,
    /// Gather steps performed (including the initial one)
    pub gather_steps: u32,
    /// Individual requests that failed or timed out
    pub failed_requests: u32,
    /// Gather steps in which every request failed
    pub total_gather_failures: u32,
    /// Re-reasoning passes triggered by reviewer rejections
    pub revisions: u32,
    /// Fragments held when the session ended
    pub fragments_stored: usize,
    /// Wall-clock time from start to terminal state
    pub elapsed_ms: u64,
}

/// Terminal output of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Session identifier
    pub session_id: String,
    /// Ticket the session analysed
    pub ticket_id: String,
    /// Final analysis; absent when none was produced or it cannot be trusted
    pub analysis: Option<Analysis>,
    /// Whether the reviewer approved `analysis`
    pub reviewed: bool,
    /// Why the session stopped
    pub termination_reason: TerminationReason,
    /// Degradation annotation for budget-forced results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<Degradation>,
    /// `Done` or `Failed`
    pub final_state: SessionState,
    /// Evidence held when the session ended
    pub evidence: EvidenceSnapshot,
    /// Reasoning/review history
    pub transcript: Vec<TranscriptEntry>,
    /// Counters
    pub stats: SessionStats,
    /// Failure detail for `Failed` sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report {
    /// Whether the caller can treat the analysis as reviewed and converged.
    pub fn is_trustworthy(&self) -> bool {
        self.termination_reason.is_approved() && self.reviewed && self.degradation.is_none()
    }
}
