//! Evidence Module
//!
//! Per-session evidence storage and the gather step that fills it.

mod gatherer;
mod store;

pub use gatherer::{EvidenceGatherer, GatherFailure, GatherResult};
pub use store::EvidenceStore;
