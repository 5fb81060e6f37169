//! Oncall RCA
//!
//! Orchestration engine for support-ticket root-cause analysis. A session takes
//! a `Ticket`, gathers code and log evidence through pluggable search
//! providers, lets a `Reasoner` decide whether the evidence suffices, has a
//! `Reviewer` validate the result, and returns a `Report` whose
//! `termination_reason` says whether the analysis was approved or degraded.
//!
//! ## Crates
//!
//! - `oncall_rca_core` - data model, errors, session configuration
//! - `oncall_rca_capabilities` - search/reasoner/reviewer traits
//! - this crate - evidence store, gatherer, budget and state machine

pub mod services;

pub use services::{
    BudgetController, BudgetLimit, EvidenceGatherer, EvidenceStore, GatherFailure, GatherResult,
    Orchestrator, OrchestratorError, SessionEvent, SessionHandle, SessionStatus,
};

// Re-export the data model and capability traits
pub use oncall_rca_capabilities::{
    CapabilityError, CapabilityResult, FixtureSearchProvider, Reasoner, Reviewer, SearchContext,
    SearchProvider,
};
pub use oncall_rca_core::{
    Analysis, AnalysisOutcome, CoreError, CoreResult, Degradation, EvidenceFragment, EvidenceKind,
    EvidenceLocator, EvidenceRequest, EvidenceSnapshot, Report, ReviewVerdict, SessionConfig,
    SessionConfigBuilder, SessionState, SessionStats, TerminationReason, Ticket, TimeWindow,
    TranscriptEntry, TranscriptSource, MAX_WINDOW_PADDING_SECS,
};
