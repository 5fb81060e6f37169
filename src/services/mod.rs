//! Services
//!
//! Evidence handling and the orchestration engine built on top of it.

pub mod evidence;
pub mod orchestrator;

pub use evidence::{EvidenceGatherer, EvidenceStore, GatherFailure, GatherResult};
pub use orchestrator::{
    BudgetController, BudgetLimit, Orchestrator, OrchestratorError, SessionEvent, SessionHandle,
    SessionStatus,
};
