//! Capability Traits
//!
//! The three black-box capabilities the orchestrator depends on. Concrete
//! backends (a ripgrep code index, a Loki client, an LLM-backed reasoner) are
//! swappable variants behind these traits and live outside this workspace.

use std::sync::Arc;

use async_trait::async_trait;

use oncall_rca_core::{
    Analysis, EvidenceFragment, EvidenceKind, EvidenceRequest, EvidenceSnapshot, ReviewVerdict,
    Ticket,
};

use crate::error::CapabilityResult;

/// Read-only context handed to a search provider alongside each request.
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// Session the search belongs to
    pub session_id: String,
    /// Ticket under investigation
    pub ticket: Arc<Ticket>,
    /// Evidence already gathered before this step
    pub evidence: EvidenceSnapshot,
}

impl SearchContext {
    pub fn new(session_id: impl Into<String>, ticket: Arc<Ticket>, evidence: EvidenceSnapshot) -> Self {
        Self {
            session_id: session_id.into(),
            ticket,
            evidence,
        }
    }
}

/// Code or log search backend.
///
/// Returns zero or more fragments for a request. May fail or hang; the
/// gatherer bounds every call with its own timeout.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &str;

    /// Which requests this provider serves.
    fn kind(&self) -> EvidenceKind;

    /// Run one search.
    async fn search(
        &self,
        request: &EvidenceRequest,
        context: &SearchContext,
    ) -> CapabilityResult<Vec<EvidenceFragment>>;
}

/// Evaluates the evidence and either converges or asks for more.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Returns the reasoner name for identification.
    fn name(&self) -> &str;

    /// Produce an analysis.
    ///
    /// `revision_reasons` is `Some` only on the pass that follows a reviewer
    /// rejection, so the reasoner can tell "the evidence was insufficient"
    /// apart from "the analysis was rejected".
    async fn reason(
        &self,
        ticket: &Ticket,
        evidence: &EvidenceSnapshot,
        revision_reasons: Option<&[String]>,
    ) -> CapabilityResult<Analysis>;
}

/// Validates a converged (or budget-forced) analysis.
#[async_trait]
pub trait Reviewer: Send + Sync {
    /// Returns the reviewer name for identification.
    fn name(&self) -> &str;

    /// Approve or reject an analysis.
    async fn review(
        &self,
        ticket: &Ticket,
        evidence: &EvidenceSnapshot,
        analysis: &Analysis,
    ) -> CapabilityResult<ReviewVerdict>;
}
