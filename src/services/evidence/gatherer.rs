//! Evidence Gatherer
//!
//! Runs one gather step: coalesces requests, dispatches them to the provider
//! registered for their kind in parallel, each under its own timeout, and
//! merges the survivors into the session's store in request order.
//!
//! Provider failures never escape a gather step; they are reported in the
//! `GatherResult` and counted by the session.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use oncall_rca_capabilities::{CapabilityError, SearchContext, SearchProvider};
use oncall_rca_core::{EvidenceFragment, EvidenceKind, EvidenceRequest};

use super::store::EvidenceStore;

/// One request that produced no evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct GatherFailure {
    pub request: EvidenceRequest,
    pub cause: CapabilityError,
}

/// Outcome of one gather step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatherResult {
    /// Requests dispatched after coalescing
    pub dispatched: usize,
    /// Fragments returned by successful requests
    pub fragments_returned: usize,
    /// Fragments that are in the store after the step
    pub fragments_added: usize,
    /// Requests that failed, timed out or had no provider
    pub failures: Vec<GatherFailure>,
    /// At least one request was dispatched and every one failed
    pub total_failure: bool,
}

impl GatherResult {
    /// Requests that returned (possibly empty) results.
    pub fn succeeded(&self) -> usize {
        self.dispatched - self.failures.len()
    }

    /// One-line summary for logs and the session transcript.
    pub fn summary(&self) -> String {
        format!(
            "gathered {} fragment(s), {} new, {}/{} request(s) failed",
            self.fragments_returned,
            self.fragments_added,
            self.failures.len(),
            self.dispatched
        )
    }
}

/// Routes requests to search providers by kind.
#[derive(Clone)]
pub struct EvidenceGatherer {
    providers: HashMap<EvidenceKind, Arc<dyn SearchProvider>>,
    timeout: Duration,
}

impl EvidenceGatherer {
    pub fn new(providers: HashMap<EvidenceKind, Arc<dyn SearchProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Run one gather step against `store`.
    ///
    /// Resolves only once every dispatched call has returned, failed or timed
    /// out. An empty request set is a no-op, never a total failure.
    pub async fn gather(
        &self,
        requests: &[EvidenceRequest],
        context: &SearchContext,
        store: &mut EvidenceStore,
    ) -> GatherResult {
        let requests = coalesce(requests);
        if requests.is_empty() {
            return GatherResult::default();
        }

        let calls = requests.iter().map(|request| self.dispatch(request, context));
        let outcomes = join_all(calls).await;

        let mut result = GatherResult {
            dispatched: requests.len(),
            ..Default::default()
        };

        for (request, outcome) in requests.into_iter().zip(outcomes) {
            match outcome {
                Ok(fragments) => {
                    result.fragments_returned += fragments.len();
                    result.fragments_added += store.add(fragments);
                }
                Err(cause) => {
                    warn!(
                        session_id = %context.session_id,
                        kind = %request.kind,
                        query = %request.query,
                        error = %cause,
                        "evidence request failed"
                    );
                    result.failures.push(GatherFailure { request, cause });
                }
            }
        }

        result.total_failure = result.failures.len() == result.dispatched;
        debug!(
            session_id = %context.session_id,
            dispatched = result.dispatched,
            returned = result.fragments_returned,
            added = result.fragments_added,
            failed = result.failures.len(),
            "gather step finished"
        );
        result
    }

    async fn dispatch(
        &self,
        request: &EvidenceRequest,
        context: &SearchContext,
    ) -> Result<Vec<EvidenceFragment>, CapabilityError> {
        let provider = self.providers.get(&request.kind).ok_or_else(|| {
            CapabilityError::unavailable(format!("no {} search provider registered", request.kind))
        })?;

        match tokio::time::timeout(self.timeout, provider.search(request, context)).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// Drop requests whose (kind, trimmed query) was already seen, keeping the
/// first occurrence.
fn coalesce(requests: &[EvidenceRequest]) -> Vec<EvidenceRequest> {
    let mut seen = HashSet::new();
    requests
        .iter()
        .filter(|r| seen.insert(r.coalesce_key()))
        .cloned()
        .collect()
}
