//! Orchestrator Module
//!
//! Runs the bounded gather → reason → review loop for one ticket per session
//! and reports how the session ended.

mod budget;
mod engine;
mod error;
mod events;
mod handle;
mod machine;

pub use budget::{BudgetController, BudgetLimit};
pub use engine::Orchestrator;
pub use error::OrchestratorError;
pub use events::{SessionEvent, SessionStatus};
pub use handle::SessionHandle;
