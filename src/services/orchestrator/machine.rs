//! Session State Machine
//!
//! Drives one ticket through
//! `Init → Gathering → Reasoning → {Gathering | Reviewing} → {Done | Revising}`
//! on a single task. Every "gather more" or "revise" decision is an explicit
//! loop turn bounded by the session's budgets, never recursion.
//!
//! Failure semantics:
//! - Provider failures are absorbed into gather statistics.
//! - Consecutive total gather failures end the session `evidence_unavailable`.
//! - Reasoner or reviewer errors end the session `capability_failure`.
//! - An exhausted budget forces review, then a degraded `Done`.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use oncall_rca_capabilities::{Reasoner, Reviewer, SearchContext};
use oncall_rca_core::{
    Analysis, Degradation, EvidenceRequest, Report, SessionConfig, SessionState, SessionStats,
    TerminationReason, Ticket, TranscriptEntry, TranscriptSource,
};

use super::budget::BudgetController;
use super::events::{SessionEvent, SessionStatus};
use crate::services::evidence::{EvidenceGatherer, EvidenceStore};

// ============================================================================
// Wiring
// ============================================================================

/// Capabilities a session calls into.
#[derive(Clone)]
pub(crate) struct SessionCapabilities {
    pub gatherer: EvidenceGatherer,
    pub reasoner: Arc<dyn Reasoner>,
    pub reviewer: Arc<dyn Reviewer>,
}

/// Channels through which a session reports progress.
#[derive(Clone)]
pub(crate) struct SessionChannels {
    pub status: Arc<RwLock<SessionStatus>>,
    pub events: Option<mpsc::Sender<SessionEvent>>,
    pub cancel: CancellationToken,
}

/// How a session ended.
#[derive(Debug, Clone)]
struct Termination {
    state: SessionState,
    reason: TerminationReason,
    reviewed: bool,
    degradation: Option<Degradation>,
    keep_analysis: bool,
    error: Option<String>,
}

impl Termination {
    fn done(reason: TerminationReason, reviewed: bool, degradation: Option<Degradation>) -> Self {
        Self {
            state: SessionState::Done,
            reason,
            reviewed,
            degradation,
            keep_analysis: true,
            error: None,
        }
    }

    fn failed(reason: TerminationReason, error: impl Into<String>, keep_analysis: bool) -> Self {
        Self {
            state: SessionState::Failed,
            reason,
            reviewed: false,
            degradation: None,
            keep_analysis,
            error: Some(error.into()),
        }
    }
}

/// The states the loop steps through; terminal states are only entered by
/// `Session::finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Gathering,
    Reasoning,
    Reviewing,
    Revising,
}

impl From<Phase> for SessionState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Init => SessionState::Init,
            Phase::Gathering => SessionState::Gathering,
            Phase::Reasoning => SessionState::Reasoning,
            Phase::Reviewing => SessionState::Reviewing,
            Phase::Revising => SessionState::Revising,
        }
    }
}

enum Step {
    Next(Phase),
    Stop(Termination),
}

/// The initial broad request set: one code and one log request, scoped to the
/// ticket's services, the log request also to its padded time window.
pub(crate) fn initial_requests(ticket: &Ticket, config: &SessionConfig) -> Vec<EvidenceRequest> {
    let query = if ticket.services.is_empty() {
        ticket.symptom.clone()
    } else {
        format!("{} {}", ticket.services.join(" "), ticket.symptom)
    };

    vec![
        EvidenceRequest::code(query.clone()).with_services(ticket.services.iter().cloned()),
        EvidenceRequest::log(query)
            .with_services(ticket.services.iter().cloned())
            .with_time_window(ticket.scope_window(config.initial_window_padding())),
    ]
}

// ============================================================================
// Session
// ============================================================================

/// One running analysis. Owned by its task; consumed on termination.
pub(crate) struct Session {
    id: String,
    ticket: Arc<Ticket>,
    config: SessionConfig,
    capabilities: SessionCapabilities,
    channels: SessionChannels,
    store: EvidenceStore,
    budget: BudgetController,
    phase: Phase,
    analysis: Option<Analysis>,
    pending_requests: Vec<EvidenceRequest>,
    pending_reasons: Option<Vec<String>>,
    consecutive_total_failures: u32,
    revisions: u32,
    stats: SessionStats,
    transcript: Vec<TranscriptEntry>,
}

impl Session {
    pub(crate) fn new(
        id: String,
        ticket: Arc<Ticket>,
        config: SessionConfig,
        capabilities: SessionCapabilities,
        channels: SessionChannels,
    ) -> Self {
        Self {
            store: EvidenceStore::from_config(&config),
            budget: BudgetController::from_config(&config),
            id,
            ticket,
            config,
            capabilities,
            channels,
            phase: Phase::Init,
            analysis: None,
            pending_requests: Vec::new(),
            pending_reasons: None,
            consecutive_total_failures: 0,
            revisions: 0,
            stats: SessionStats::default(),
            transcript: Vec::new(),
        }
    }

    /// Run to a terminal state and produce the report.
    pub(crate) async fn run(mut self) -> Report {
        info!(
            session_id = %self.id,
            ticket_id = %self.ticket.id,
            services = %self.ticket.services_label(),
            "session started"
        );
        self.emit(SessionEvent::Started {
            session_id: self.id.clone(),
            ticket_id: self.ticket.id.clone(),
        });

        let cancel = self.channels.cancel.clone();
        loop {
            let step = if cancel.is_cancelled() {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    step = self.step() => Some(step),
                }
            };
            let step = step.unwrap_or_else(|| Step::Stop(Self::cancelled()));

            match step {
                Step::Next(next) => {
                    let from = self.phase.into();
                    self.phase = next;
                    self.transition(from, next.into()).await;
                }
                Step::Stop(termination) => return self.finish(termination).await,
            }
        }
    }

    async fn step(&mut self) -> Step {
        match self.phase {
            Phase::Init => {
                self.pending_requests = initial_requests(&self.ticket, &self.config);
                Step::Next(Phase::Gathering)
            }
            Phase::Gathering => self.gather().await,
            Phase::Reasoning => self.reason().await,
            Phase::Reviewing => self.review().await,
            Phase::Revising => self.revise(),
        }
    }

    // ========================================================================
    // States
    // ========================================================================

    async fn gather(&mut self) -> Step {
        let requests = std::mem::take(&mut self.pending_requests);
        let context = SearchContext::new(self.id.clone(), self.ticket.clone(), self.store.snapshot());
        let result = self
            .capabilities
            .gatherer
            .gather(&requests, &context, &mut self.store)
            .await;

        self.stats.gather_steps += 1;
        self.stats.failed_requests += result.failures.len() as u32;
        self.budget.record_evidence_volume(self.store.ingested_bytes());
        self.record(TranscriptSource::Gatherer, result.summary());
        self.channels.status.write().await.fragments = self.store.len();
        self.emit(SessionEvent::EvidenceGathered {
            session_id: self.id.clone(),
            returned: result.fragments_returned,
            added: result.fragments_added,
            failed: result.failures.len(),
            total_failure: result.total_failure,
        });

        if result.total_failure {
            self.consecutive_total_failures += 1;
            self.stats.total_gather_failures += 1;
            warn!(
                session_id = %self.id,
                consecutive = self.consecutive_total_failures,
                limit = self.config.max_total_gather_failures,
                "every evidence request failed"
            );
            if self.consecutive_total_failures >= self.config.max_total_gather_failures {
                return Step::Stop(Termination::failed(
                    TerminationReason::EvidenceUnavailable,
                    format!(
                        "{} consecutive gather steps returned no evidence",
                        self.consecutive_total_failures
                    ),
                    true,
                ));
            }
        } else if result.succeeded() > 0 {
            self.consecutive_total_failures = 0;
        }

        Step::Next(Phase::Reasoning)
    }

    async fn reason(&mut self) -> Step {
        let iteration = self.budget.record_iteration();
        self.stats.iterations = iteration;
        self.channels.status.write().await.iteration = iteration;

        let snapshot = self.store.snapshot();
        let reasons = self.pending_reasons.take();
        let reasoner = self.capabilities.reasoner.clone();

        let outcome = reasoner
            .reason(&self.ticket, &snapshot, reasons.as_deref())
            .await
            .and_then(|analysis| {
                analysis.validate()?;
                Ok(analysis)
            });

        let analysis = match outcome {
            Ok(analysis) => analysis,
            Err(e) => {
                return Step::Stop(Termination::failed(
                    TerminationReason::CapabilityFailure,
                    format!("reasoner '{}' failed: {}", reasoner.name(), e),
                    false,
                ));
            }
        };

        if !analysis.reasoning.is_empty() {
            self.record(TranscriptSource::Reasoner, analysis.reasoning.clone());
        }
        self.record(
            TranscriptSource::Reasoner,
            format!(
                "{} (confidence {:.2}): {}",
                if analysis.is_complete() { "complete" } else { "needs evidence" },
                analysis.confidence,
                analysis.root_cause
            ),
        );
        self.emit(SessionEvent::AnalysisProduced {
            session_id: self.id.clone(),
            iteration,
            complete: analysis.is_complete(),
            confidence: analysis.confidence,
        });

        let next = if analysis.is_complete() {
            Phase::Reviewing
        } else if let Some(limit) = self.budget.exhaustion() {
            info!(
                session_id = %self.id,
                iteration,
                limit = %limit,
                "budget exhausted, forcing review"
            );
            Phase::Reviewing
        } else {
            self.pending_requests = analysis.requests().to_vec();
            Phase::Gathering
        };

        self.analysis = Some(analysis);
        Step::Next(next)
    }

    async fn review(&mut self) -> Step {
        let Some(analysis) = self.analysis.clone() else {
            return Step::Stop(Termination::failed(
                TerminationReason::CapabilityFailure,
                "no analysis to review",
                false,
            ));
        };

        let reviewer = self.capabilities.reviewer.clone();
        let snapshot = self.store.snapshot();
        let verdict = match reviewer.review(&self.ticket, &snapshot, &analysis).await {
            Ok(verdict) => verdict,
            Err(e) => {
                return Step::Stop(Termination::failed(
                    TerminationReason::CapabilityFailure,
                    format!("reviewer '{}' failed: {}", reviewer.name(), e),
                    false,
                ));
            }
        };

        if !verdict.reasoning.is_empty() {
            self.record(TranscriptSource::Reviewer, verdict.reasoning.clone());
        }
        self.record(
            TranscriptSource::Reviewer,
            if verdict.approved {
                "approved".to_string()
            } else {
                format!("rejected: {}", verdict.reasons.join("; "))
            },
        );
        self.emit(SessionEvent::Reviewed {
            session_id: self.id.clone(),
            approved: verdict.approved,
        });

        if verdict.approved {
            return Step::Stop(if analysis.is_complete() {
                Termination::done(TerminationReason::Approved, true, None)
            } else {
                Termination::done(
                    TerminationReason::BudgetExhausted,
                    true,
                    Some(Degradation::InsufficientEvidence),
                )
            });
        }

        let exhausted = self.budget.exhaustion();
        if exhausted.is_some() || self.revisions >= self.config.max_review_revisions {
            info!(
                session_id = %self.id,
                revisions = self.revisions,
                limit = ?exhausted,
                "review rejected with no budget left to revise"
            );
            return Step::Stop(Termination::done(
                TerminationReason::BudgetExhausted,
                false,
                Some(Degradation::UnreviewedBestEffort),
            ));
        }

        let mut reasons = verdict.reasons;
        if reasons.is_empty() {
            reasons.push("reviewer rejected the analysis without giving reasons".to_string());
        }
        self.pending_reasons = Some(reasons);
        self.pending_requests = verdict.evidence_requests;
        Step::Next(Phase::Revising)
    }

    fn revise(&mut self) -> Step {
        self.revisions += 1;
        self.stats.revisions = self.revisions;

        if self.pending_requests.is_empty() {
            Step::Next(Phase::Reasoning)
        } else {
            debug!(
                session_id = %self.id,
                requests = self.pending_requests.len(),
                "gathering reviewer-requested evidence before revising"
            );
            Step::Next(Phase::Gathering)
        }
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    fn cancelled() -> Termination {
        Termination::failed(TerminationReason::Cancelled, "session cancelled", true)
    }

    async fn transition(&mut self, from: SessionState, to: SessionState) {
        let iteration = self.budget.iterations();

        info!(
            session_id = %self.id,
            from = %from,
            to = %to,
            iteration,
            "session transition"
        );

        {
            let mut status = self.channels.status.write().await;
            status.state = to;
            status.revisions = self.revisions;
        }

        self.emit(SessionEvent::Transition {
            session_id: self.id.clone(),
            from,
            to,
            iteration,
        });
    }

    async fn finish(mut self, termination: Termination) -> Report {
        self.transition(self.phase.into(), termination.state).await;

        self.stats.fragments_stored = self.store.len();
        self.stats.elapsed_ms = self.budget.elapsed().as_millis() as u64;

        match &termination.error {
            Some(error) => warn!(
                session_id = %self.id,
                reason = %termination.reason,
                error = %error,
                "session failed"
            ),
            None => info!(
                session_id = %self.id,
                reason = %termination.reason,
                degradation = ?termination.degradation,
                iterations = self.stats.iterations,
                fragments = self.stats.fragments_stored,
                "session finished"
            ),
        }

        self.emit(SessionEvent::Finished {
            session_id: self.id.clone(),
            final_state: termination.state,
            termination_reason: termination.reason,
        });

        Report {
            session_id: self.id,
            ticket_id: self.ticket.id.clone(),
            analysis: if termination.keep_analysis {
                self.analysis
            } else {
                None
            },
            reviewed: termination.reviewed,
            termination_reason: termination.reason,
            degradation: termination.degradation,
            final_state: termination.state,
            evidence: self.store.into_snapshot(),
            transcript: self.transcript,
            stats: self.stats,
            error: termination.error,
        }
    }

    fn record(&mut self, source: TranscriptSource, message: impl Into<String>) {
        self.transcript
            .push(TranscriptEntry::new(self.budget.iterations(), source, message));
    }

    /// Publish without waiting: a full or closed channel drops the event.
    fn emit(&self, event: SessionEvent) {
        let Some(tx) = &self.channels.events else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!(session_id = %self.id, event = ?event, "event channel full, dropping event")
            }
            Err(TrySendError::Closed(_)) => {
                debug!(session_id = %self.id, "event channel closed")
            }
        }
    }
}
