//! Oncall RCA Capabilities
//!
//! Interfaces to the external capabilities the orchestrator drives:
//! - `SearchProvider` - code and log search backends
//! - `Reasoner` - evaluates evidence, converges or asks for more
//! - `Reviewer` - approves or rejects an analysis
//!
//! Also includes `FixtureSearchProvider`, a canned-response backend for
//! replaying investigations.

pub mod error;
pub mod fixture;
pub mod provider;

pub use error::{CapabilityError, CapabilityResult};
pub use fixture::FixtureSearchProvider;
pub use provider::{Reasoner, Reviewer, SearchContext, SearchProvider};
