//! Orchestrator
//!
//! Entry point: validates a session configuration, wires the registered
//! capabilities into a new session and runs it, either on its own task
//! (`start_session`) or inline (`run_session`).
//!
//! Sessions share nothing mutable. Providers, reasoner and reviewer are shared
//! as `Arc<dyn ...>`; each session owns its store, budget and state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use oncall_rca_capabilities::{Reasoner, Reviewer, SearchProvider};
use oncall_rca_core::{CoreResult, EvidenceKind, Report, SessionConfig, Ticket};

use super::events::{SessionEvent, SessionStatus};
use super::handle::SessionHandle;
use super::machine::{Session, SessionCapabilities, SessionChannels};
use crate::services::evidence::EvidenceGatherer;

/// Starts and runs analysis sessions against a fixed set of capabilities.
#[derive(Clone)]
pub struct Orchestrator {
    providers: HashMap<EvidenceKind, Arc<dyn SearchProvider>>,
    reasoner: Arc<dyn Reasoner>,
    reviewer: Arc<dyn Reviewer>,
    event_tx: Option<mpsc::Sender<SessionEvent>>,
}

impl Orchestrator {
    /// Create an orchestrator with no search providers registered.
    pub fn new(reasoner: Arc<dyn Reasoner>, reviewer: Arc<dyn Reviewer>) -> Self {
        Self {
            providers: HashMap::new(),
            reasoner,
            reviewer,
            event_tx: None,
        }
    }

    /// Register a search provider for the kind it declares, replacing any
    /// provider previously registered for that kind.
    pub fn with_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        debug!(provider = provider.name(), kind = %provider.kind(), "registering search provider");
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Publish session events to `event_tx`. Events that do not fit in the
    /// channel are dropped.
    pub fn with_event_sender(mut self, event_tx: mpsc::Sender<SessionEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Kinds with a registered provider.
    pub fn provider_kinds(&self) -> Vec<EvidenceKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|k| k.to_string());
        kinds
    }

    /// Validate `config` and spawn a session on the current tokio runtime.
    pub fn start_session(&self, ticket: Ticket, config: SessionConfig) -> CoreResult<SessionHandle> {
        let (session, channels, id) = self.prepare(ticket, config)?;
        let task = tokio::spawn(session.run());
        Ok(SessionHandle::new(id, channels.status, channels.cancel, task))
    }

    /// Validate `config` and run a session to completion on the calling task.
    pub async fn run_session(&self, ticket: Ticket, config: SessionConfig) -> CoreResult<Report> {
        let (session, _, _) = self.prepare(ticket, config)?;
        Ok(session.run().await)
    }

    fn prepare(
        &self,
        ticket: Ticket,
        config: SessionConfig,
    ) -> CoreResult<(Session, SessionChannels, String)> {
        config.validate()?;

        let id = uuid::Uuid::new_v4().to_string();
        let channels = SessionChannels {
            status: Arc::new(RwLock::new(SessionStatus::default())),
            events: self.event_tx.clone(),
            cancel: CancellationToken::new(),
        };
        let capabilities = SessionCapabilities {
            gatherer: EvidenceGatherer::new(self.providers.clone(), config.provider_timeout()),
            reasoner: self.reasoner.clone(),
            reviewer: self.reviewer.clone(),
        };

        let session = Session::new(
            id.clone(),
            Arc::new(ticket),
            config,
            capabilities,
            channels.clone(),
        );
        Ok((session, channels, id))
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("providers", &self.provider_kinds())
            .field("reasoner", &self.reasoner.name())
            .field("reviewer", &self.reviewer.name())
            .finish()
    }
}
