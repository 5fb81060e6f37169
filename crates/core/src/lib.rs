//! Oncall RCA Core
//!
//! Foundational error types, data model, and session configuration for the
//! oncall root-cause-analysis orchestrator. This crate has no dependency on the
//! async runtime or on any capability implementation.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `ticket` - The structured problem report (`Ticket`, `TimeWindow`)
//! - `evidence` - Retrieved fragments, requests and snapshots
//! - `analysis` - Reasoner and Reviewer output contracts
//! - `report` - Session states and the terminal `Report`
//! - `builders` - `SessionConfig` and its validating builder
//!
//! ## Design Principles
//!
//! 1. **Only serde/thiserror/chrono/toml** - keeps the model cheap to depend on
//! 2. **Immutable inputs** - tickets, fragments and snapshots are never mutated
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod analysis;
pub mod builders;
pub mod error;
pub mod evidence;
pub mod report;
pub mod ticket;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Data Model ─────────────────────────────────────────────────────────
pub use analysis::{Analysis, AnalysisOutcome, ReviewVerdict};
pub use evidence::{
    EvidenceFragment, EvidenceKind, EvidenceLocator, EvidenceRequest, EvidenceSnapshot,
};
pub use ticket::{Ticket, TimeWindow};

// ── Session States & Report ────────────────────────────────────────────
pub use report::{
    Degradation, Report, SessionState, SessionStats, TerminationReason, TranscriptEntry,
    TranscriptSource,
};

// ── Configuration ──────────────────────────────────────────────────────
pub use builders::{
    SessionConfig, SessionConfigBuilder, DEFAULT_WINDOW_PADDING_SECS, MAX_WINDOW_PADDING_SECS,
};
