//! Fixture Search Provider
//!
//! A `SearchProvider` that answers from canned responses keyed by query. Used
//! to replay a recorded investigation, and as the search backend in tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use oncall_rca_core::{EvidenceFragment, EvidenceKind, EvidenceRequest};

use crate::error::{CapabilityError, CapabilityResult};
use crate::provider::{SearchContext, SearchProvider};

#[derive(Debug, Clone)]
enum FixtureResponse {
    Fragments(Vec<EvidenceFragment>),
    Failure(CapabilityError),
}

/// Canned-response search provider.
///
/// Unknown queries fall back to the default response (empty unless set).
#[derive(Debug)]
pub struct FixtureSearchProvider {
    name: String,
    kind: EvidenceKind,
    responses: HashMap<String, FixtureResponse>,
    fallback: FixtureResponse,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FixtureSearchProvider {
    /// Create a provider that returns nothing for every query.
    pub fn new(name: impl Into<String>, kind: EvidenceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            responses: HashMap::new(),
            fallback: FixtureResponse::Fragments(Vec::new()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `query` with `fragments`.
    pub fn with_response(mut self, query: impl Into<String>, fragments: Vec<EvidenceFragment>) -> Self {
        self.responses
            .insert(normalize(&query.into()), FixtureResponse::Fragments(fragments));
        self
    }

    /// Fail `query` with `error`.
    pub fn with_failure(mut self, query: impl Into<String>, error: CapabilityError) -> Self {
        self.responses
            .insert(normalize(&query.into()), FixtureResponse::Failure(error));
        self
    }

    /// Answer unknown queries with `fragments`.
    pub fn with_default(mut self, fragments: Vec<EvidenceFragment>) -> Self {
        self.fallback = FixtureResponse::Fragments(fragments);
        self
    }

    /// Fail every unknown query with `error`.
    pub fn failing(mut self, error: CapabilityError) -> Self {
        self.fallback = FixtureResponse::Failure(error);
        self
    }

    /// Sleep before answering, to simulate a slow backend.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queries received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn normalize(query: &str) -> String {
    query.trim().to_string()
}

#[async_trait]
impl SearchProvider for FixtureSearchProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EvidenceKind {
        self.kind
    }

    async fn search(
        &self,
        request: &EvidenceRequest,
        context: &SearchContext,
    ) -> CapabilityResult<Vec<EvidenceFragment>> {
        let query = normalize(&request.query);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.get(&query).unwrap_or(&self.fallback);
        debug!(
            provider = %self.name,
            session_id = %context.session_id,
            query = %query,
            known = self.responses.contains_key(&query),
            "fixture search"
        );

        match response {
            FixtureResponse::Fragments(fragments) => Ok(fragments.clone()),
            FixtureResponse::Failure(error) => Err(error.clone()),
        }
    }
}
