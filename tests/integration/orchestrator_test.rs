//! Orchestrator Integration Tests
//!
//! End-to-end sessions against fixture providers and scripted reasoner and
//! reviewer doubles:
//! - convergence and approval
//! - termination under each budget
//! - total gather failure escalation
//! - capability failures and cancellation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use oncall_rca::{
    Analysis, CapabilityError, Degradation, EvidenceKind, EvidenceRequest, ReviewVerdict,
    SessionEvent, SessionState, TerminationReason,
};

use crate::support::{
    code_fragment, code_provider, config, log_fragment, log_provider, orchestrator,
    payments_ticket, ScriptedReasoner, ScriptedReviewer,
};

const INITIAL_QUERY: &str = "payments 5xx spike";

// ============================================================================
// Convergence
// ============================================================================

#[tokio::test]
async fn test_payments_scenario_converges_and_is_approved() {
    let code = code_provider().with_response(
        INITIAL_QUERY,
        vec![
            code_fragment("payments/src/charge.ts", 0.8),
            code_fragment("payments/src/gateway.ts", 0.6),
        ],
    );
    let log = log_provider()
        .with_response(
            INITIAL_QUERY,
            vec![
                log_fragment("default/payments", 1, 0.9),
                log_fragment("default/payments", 2, 0.7),
                log_fragment("default/payments", 3, 0.5),
            ],
        )
        .with_response(
            "payments upstream timeout",
            vec![log_fragment("default/payments-gateway", 2, 0.9)],
        );
    let reasoner = Arc::new(ScriptedReasoner::new(vec![
        Ok(Analysis::needs_evidence(
            "gateway errors suspected",
            0.4,
            vec![EvidenceRequest::log("payments upstream timeout")],
        )),
        Ok(Analysis::complete("card gateway timeouts surface as 502", 0.8)),
    ]));
    let reviewer = Arc::new(ScriptedReviewer::approving());

    let report = orchestrator(code, log, reasoner.clone(), reviewer.clone())
        .run_session(payments_ticket(), config().max_iterations(3).build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.final_state, SessionState::Done);
    assert_eq!(report.termination_reason, TerminationReason::Approved);
    assert!(report.reviewed);
    assert!(report.degradation.is_none());
    assert!(report.is_trustworthy());
    assert_eq!(report.evidence.len(), 6);
    assert_eq!(report.stats.iterations, 2);
    assert_eq!(report.stats.gather_steps, 2);
    assert_eq!(report.analysis.as_ref().unwrap().confidence, 0.8);

    let calls = reasoner.calls();
    assert_eq!(calls[0].fragments, 5);
    assert_eq!(calls[1].fragments, 6);
    assert!(calls.iter().all(|c| c.revision_reasons.is_none()));
    assert_eq!(reviewer.call_count(), 1);
}

#[tokio::test]
async fn test_gather_steps_preserve_retrieval_order() {
    let code = code_provider().with_default(vec![code_fragment("a.ts", 0.1)]);
    let log = log_provider()
        .with_response(INITIAL_QUERY, vec![log_fragment("default/payments", 1, 0.9)])
        .with_response("follow up", vec![log_fragment("default/payments", 5, 0.2)]);
    let reasoner = Arc::new(ScriptedReasoner::new(vec![
        Ok(Analysis::needs_evidence("?", 0.1, vec![EvidenceRequest::log("follow up")])),
        Ok(Analysis::complete("done", 0.7)),
    ]));

    let report = orchestrator(code, log, reasoner, Arc::new(ScriptedReviewer::approving()))
        .run_session(payments_ticket(), config().build().unwrap())
        .await
        .unwrap();

    let kinds: Vec<_> = report.evidence.iter().map(|f| f.kind()).collect();
    assert_eq!(kinds, vec![EvidenceKind::Code, EvidenceKind::Log, EvidenceKind::Log]);
    assert!(report.evidence.fragments()[2].content.contains("minute 5"));
}

#[tokio::test]
async fn test_partial_provider_failure_still_reaches_reasoning() {
    let code = code_provider().failing(CapabilityError::unavailable("code index offline"));
    let log = log_provider().with_default(vec![
        log_fragment("default/payments", 1, 0.9),
        log_fragment("default/payments", 2, 0.8),
    ]);
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("db pool", 0.7))));

    let report = orchestrator(code, log, reasoner.clone(), Arc::new(ScriptedReviewer::approving()))
        .run_session(payments_ticket(), config().build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::Approved);
    assert_eq!(report.stats.failed_requests, 1);
    assert_eq!(report.stats.total_gather_failures, 0);
    assert_eq!(report.evidence.len(), 2);
    assert_eq!(reasoner.calls()[0].fragments, 2);
}

#[tokio::test]
async fn test_repeated_fragments_are_stored_once() {
    let code = code_provider().with_default(vec![code_fragment("payments/src/charge.ts", 0.5)]);
    let log = log_provider().with_default(vec![log_fragment("default/payments", 1, 0.5)]);
    let reasoner = Arc::new(ScriptedReasoner::new(vec![
        Ok(Analysis::needs_evidence(
            "?",
            0.2,
            vec![EvidenceRequest::code("charge"), EvidenceRequest::log("errors")],
        )),
        Ok(Analysis::complete("done", 0.9)),
    ]));

    let report = orchestrator(code, log, reasoner, Arc::new(ScriptedReviewer::approving()))
        .run_session(payments_ticket(), config().build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.stats.gather_steps, 2);
    assert_eq!(report.evidence.len(), 2);
}

// ============================================================================
// Budgets & Degraded Completion
// ============================================================================

#[tokio::test]
async fn test_always_insufficient_reasoner_stops_at_iteration_cap() {
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::needs_evidence(
        "not sure yet",
        0.3,
        vec![EvidenceRequest::log("more logs")],
    ))));
    let reviewer = Arc::new(ScriptedReviewer::approving());

    let report = orchestrator(code_provider(), log_provider(), reasoner.clone(), reviewer.clone())
        .run_session(payments_ticket(), config().max_iterations(3).build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.final_state, SessionState::Done);
    assert_eq!(report.termination_reason, TerminationReason::BudgetExhausted);
    assert_eq!(report.degradation, Some(Degradation::InsufficientEvidence));
    assert!(report.reviewed);
    assert!(!report.is_trustworthy());
    assert_eq!(reasoner.call_count(), 3);
    assert_eq!(report.stats.iterations, 3);
    assert_eq!(report.stats.gather_steps, 3);
    assert_eq!(reviewer.call_count(), 1);
    assert!(report.analysis.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_duration_budget_forces_review() {
    let reasoner = Arc::new(
        ScriptedReasoner::always(Ok(Analysis::needs_evidence(
            "slow thinking",
            0.3,
            vec![EvidenceRequest::code("more code")],
        )))
        .with_delay(Duration::from_secs(10)),
    );

    let report = orchestrator(
        code_provider(),
        log_provider(),
        reasoner.clone(),
        Arc::new(ScriptedReviewer::approving()),
    )
    .run_session(
        payments_ticket(),
        config()
            .max_iterations(100)
            .max_duration(Duration::from_secs(15))
            .build()
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::BudgetExhausted);
    assert_eq!(report.degradation, Some(Degradation::InsufficientEvidence));
    assert_eq!(reasoner.call_count(), 2);
}

#[tokio::test]
async fn test_evidence_volume_budget_forces_review() {
    let code = code_provider().with_default(vec![code_fragment("payments/src/charge.ts", 0.5)]);
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::needs_evidence(
        "?",
        0.3,
        vec![EvidenceRequest::code("more")],
    ))));

    let report = orchestrator(code, log_provider(), reasoner.clone(), Arc::new(ScriptedReviewer::approving()))
        .run_session(payments_ticket(), config().max_evidence_volume(10).build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::BudgetExhausted);
    assert_eq!(reasoner.call_count(), 1);
    assert_eq!(report.stats.gather_steps, 1);
}

#[tokio::test]
async fn test_always_rejecting_reviewer_bounded_by_revisions() {
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("config drift", 0.6))));
    let reviewer = Arc::new(ScriptedReviewer::rejecting());

    let report = orchestrator(code_provider(), log_provider(), reasoner.clone(), reviewer.clone())
        .run_session(
            payments_ticket(),
            config().max_iterations(10).max_review_revisions(2).build().unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(report.final_state, SessionState::Done);
    assert_eq!(report.termination_reason, TerminationReason::BudgetExhausted);
    assert_eq!(report.degradation, Some(Degradation::UnreviewedBestEffort));
    assert!(!report.reviewed);
    assert_eq!(report.stats.revisions, 2);
    assert_eq!(reasoner.call_count(), 3);
    assert_eq!(reviewer.call_count(), 3);

    let calls = reasoner.calls();
    assert!(calls[0].revision_reasons.is_none());
    assert_eq!(
        calls[1].revision_reasons,
        Some(vec!["not convincing".to_string()])
    );
    assert_eq!(report.analysis.unwrap().root_cause, "config drift");
}

#[tokio::test]
async fn test_rejection_after_iteration_cap_is_unreviewed() {
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("x", 0.5))));
    let reviewer = Arc::new(ScriptedReviewer::rejecting());

    let report = orchestrator(code_provider(), log_provider(), reasoner.clone(), reviewer)
        .run_session(
            payments_ticket(),
            config().max_iterations(2).max_review_revisions(5).build().unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(report.degradation, Some(Degradation::UnreviewedBestEffort));
    assert_eq!(reasoner.call_count(), 2);
    assert_eq!(report.stats.revisions, 1);
}

#[tokio::test]
async fn test_zero_revisions_allowed() {
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("x", 0.5))));

    let report = orchestrator(
        code_provider(),
        log_provider(),
        reasoner.clone(),
        Arc::new(ScriptedReviewer::rejecting()),
    )
    .run_session(payments_ticket(), config().max_review_revisions(0).build().unwrap())
    .await
    .unwrap();

    assert_eq!(report.degradation, Some(Degradation::UnreviewedBestEffort));
    assert_eq!(reasoner.call_count(), 1);
}

// ============================================================================
// Reviewer-Requested Evidence
// ============================================================================

#[tokio::test]
async fn test_reviewer_evidence_requests_gathered_before_revision() {
    let log = log_provider()
        .with_response("orders service 404", vec![log_fragment("default/orders", 4, 0.9)]);
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::complete(
        "orders expire before lookup",
        0.7,
    ))));
    let reviewer = Arc::new(ScriptedReviewer::new(vec![
        Ok(ReviewVerdict::reject(["check the orders service"])
            .with_evidence_requests(vec![EvidenceRequest::log("orders service 404")])),
        Ok(ReviewVerdict::approve()),
    ]));
    let (event_tx, mut event_rx) = mpsc::channel(256);

    let report = orchestrator(code_provider(), log, reasoner.clone(), reviewer)
        .with_event_sender(event_tx)
        .run_session(payments_ticket(), config().build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::Approved);
    assert_eq!(report.stats.gather_steps, 2);
    assert_eq!(report.stats.revisions, 1);
    assert_eq!(report.evidence.len(), 1);

    let calls = reasoner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].fragments, 1);
    assert_eq!(
        calls[1].revision_reasons,
        Some(vec!["check the orders service".to_string()])
    );

    let mut path = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        if let SessionEvent::Transition { to, .. } = event {
            path.push(to);
        }
    }
    assert_eq!(
        path,
        vec![
            SessionState::Gathering,
            SessionState::Reasoning,
            SessionState::Reviewing,
            SessionState::Revising,
            SessionState::Gathering,
            SessionState::Reasoning,
            SessionState::Reviewing,
            SessionState::Done,
        ]
    );
}

// ============================================================================
// Gather Failure Escalation
// ============================================================================

#[tokio::test]
async fn test_consecutive_total_failures_end_evidence_unavailable() {
    let code = code_provider().failing(CapabilityError::unavailable("index down"));
    let log = log_provider().failing(CapabilityError::Timeout { timeout_ms: 5_000 });
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::needs_evidence(
        "no evidence",
        0.1,
        vec![EvidenceRequest::log("retry logs")],
    ))));

    let report = orchestrator(code, log, reasoner.clone(), Arc::new(ScriptedReviewer::approving()))
        .run_session(
            payments_ticket(),
            config().max_total_gather_failures(2).build().unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(report.final_state, SessionState::Failed);
    assert_eq!(report.termination_reason, TerminationReason::EvidenceUnavailable);
    assert!(!report.reviewed);
    assert_eq!(report.stats.total_gather_failures, 2);
    assert_eq!(reasoner.call_count(), 1);
    assert!(report.error.is_some());
}

#[tokio::test]
async fn test_one_fewer_total_failure_recovers() {
    let code = code_provider().failing(CapabilityError::unavailable("index down"));
    let log = log_provider()
        .failing(CapabilityError::unavailable("loki down"))
        .with_response("second try", vec![log_fragment("default/payments", 1, 0.5)]);
    let reasoner = Arc::new(ScriptedReasoner::new(vec![
        Ok(Analysis::needs_evidence(
            "no evidence",
            0.1,
            vec![EvidenceRequest::log("second try")],
        )),
        Ok(Analysis::complete("found it", 0.8)),
    ]));

    let report = orchestrator(code, log, reasoner, Arc::new(ScriptedReviewer::approving()))
        .run_session(
            payments_ticket(),
            config().max_total_gather_failures(2).build().unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(report.final_state, SessionState::Done);
    assert_eq!(report.termination_reason, TerminationReason::Approved);
    assert_eq!(report.stats.total_gather_failures, 1);
}

#[tokio::test]
async fn test_single_total_failure_limit() {
    let code = code_provider().failing(CapabilityError::unavailable("down"));
    let log = log_provider().failing(CapabilityError::unavailable("down"));
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("x", 0.5))));

    let report = orchestrator(code, log, reasoner.clone(), Arc::new(ScriptedReviewer::approving()))
        .run_session(
            payments_ticket(),
            config().max_total_gather_failures(1).build().unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::EvidenceUnavailable);
    assert!(report.analysis.is_none());
    assert_eq!(reasoner.call_count(), 0);
}

// ============================================================================
// Capability Failures
// ============================================================================

#[tokio::test]
async fn test_reasoner_error_is_capability_failure() {
    let reasoner = Arc::new(ScriptedReasoner::always(Err(CapabilityError::other(
        "model overloaded",
    ))));
    let reviewer = Arc::new(ScriptedReviewer::approving());

    let report = orchestrator(code_provider(), log_provider(), reasoner, reviewer.clone())
        .run_session(payments_ticket(), config().build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.final_state, SessionState::Failed);
    assert_eq!(report.termination_reason, TerminationReason::CapabilityFailure);
    assert!(report.analysis.is_none());
    assert!(report.error.unwrap().contains("model overloaded"));
    assert_eq!(reviewer.call_count(), 0);
}

#[tokio::test]
async fn test_empty_request_list_is_capability_failure() {
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::needs_evidence(
        "unclear",
        0.2,
        vec![],
    ))));

    let report = orchestrator(
        code_provider(),
        log_provider(),
        reasoner,
        Arc::new(ScriptedReviewer::approving()),
    )
    .run_session(payments_ticket(), config().build().unwrap())
    .await
    .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::CapabilityFailure);
    assert!(report.analysis.is_none());
}

#[tokio::test]
async fn test_reviewer_error_discards_analysis() {
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("x", 0.9))));
    let reviewer = Arc::new(ScriptedReviewer::new(vec![Err(
        CapabilityError::invalid_response("verdict missing"),
    )]));

    let report = orchestrator(code_provider(), log_provider(), reasoner, reviewer)
        .run_session(payments_ticket(), config().build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.final_state, SessionState::Failed);
    assert_eq!(report.termination_reason, TerminationReason::CapabilityFailure);
    assert!(report.analysis.is_none());
    assert!(!report.reviewed);
}

// ============================================================================
// Spawned Sessions & Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_before_first_transition() {
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("x", 0.9))));
    let handle = orchestrator(
        code_provider(),
        log_provider(),
        reasoner.clone(),
        Arc::new(ScriptedReviewer::approving()),
    )
    .start_session(payments_ticket(), config().build().unwrap())
    .unwrap();

    handle.cancel();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.final_state, SessionState::Failed);
    assert_eq!(report.termination_reason, TerminationReason::Cancelled);
    assert_eq!(report.stats.gather_steps, 0);
    assert_eq!(reasoner.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_while_reasoning() {
    let reasoner = Arc::new(
        ScriptedReasoner::always(Ok(Analysis::complete("x", 0.9)))
            .with_delay(Duration::from_secs(3600)),
    );
    let handle = orchestrator(
        code_provider(),
        log_provider().with_default(vec![log_fragment("default/payments", 1, 0.5)]),
        reasoner,
        Arc::new(ScriptedReviewer::approving()),
    )
    .start_session(payments_ticket(), config().build().unwrap())
    .unwrap();

    let status = loop {
        let status = handle.status().await;
        if status.state == SessionState::Reasoning && status.iteration == 1 {
            break status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(status.fragments, 1);
    assert_eq!(status.revisions, 0);
    assert!(!handle.is_finished());

    handle.cancel();
    let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::Cancelled);
    assert!(report.analysis.is_none());
    assert!(!report.reviewed);
    assert_eq!(report.evidence.len(), 1);
}

#[tokio::test]
async fn test_events_bracket_the_session() {
    let (event_tx, mut event_rx) = mpsc::channel(256);
    let handle = orchestrator(
        code_provider(),
        log_provider(),
        Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("x", 0.9)))),
        Arc::new(ScriptedReviewer::approving()),
    )
    .with_event_sender(event_tx)
    .start_session(payments_ticket(), config().build().unwrap())
    .unwrap();

    let session_id = handle.id().to_string();
    let report = handle.wait().await.unwrap();
    assert_eq!(report.session_id, session_id);

    let mut events = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        events.push(event);
    }
    assert!(events.iter().all(|e| e.session_id() == session_id));
    assert!(matches!(events.first(), Some(SessionEvent::Started { .. })));
    assert!(matches!(
        events.last(),
        Some(SessionEvent::Finished {
            final_state: SessionState::Done,
            termination_reason: TerminationReason::Approved,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_gathering_drops_slow_call() {
    let code = code_provider().with_default(vec![code_fragment("payments/src/charge.ts", 0.6)]);
    let log = log_provider()
        .with_default(vec![log_fragment("default/payments", 1, 0.9)])
        .with_delay(Duration::from_secs(3600));
    let reasoner = Arc::new(ScriptedReasoner::always(Ok(Analysis::needs_evidence(
        "need the error logs",
        0.4,
        vec![EvidenceRequest::log("recent payments errors")],
    ))));
    let handle = orchestrator(code, log, reasoner.clone(), Arc::new(ScriptedReviewer::approving()))
        .start_session(
            payments_ticket(),
            config().provider_timeout(Duration::from_secs(1)).build().unwrap(),
        )
        .unwrap();

    loop {
        let status = handle.status().await;
        if status.state == SessionState::Gathering && status.iteration == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    handle.cancel();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.final_state, SessionState::Failed);
    assert_eq!(report.termination_reason, TerminationReason::Cancelled);
    assert_eq!(report.stats.gather_steps, 1);
    assert_eq!(report.stats.failed_requests, 1);
    assert_eq!(report.evidence.len(), 1);
    assert_eq!(report.evidence.fragments()[0].kind(), EvidenceKind::Code);
    assert!(report.analysis.is_some());
    assert_eq!(reasoner.call_count(), 1);
    assert!(report.stats.elapsed_ms < 2_000);
}

#[tokio::test]
async fn test_undrained_event_channel_does_not_stall_session() {
    let (event_tx, mut event_rx) = mpsc::channel(1);
    let handle = orchestrator(
        code_provider(),
        log_provider(),
        Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("x", 0.9)))),
        Arc::new(ScriptedReviewer::approving()),
    )
    .with_event_sender(event_tx)
    .start_session(payments_ticket(), config().build().unwrap())
    .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::Approved);
    assert!(matches!(event_rx.try_recv(), Ok(SessionEvent::Started { .. })));
    assert!(event_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_dropped_event_receiver_does_not_fail_session() {
    let (event_tx, event_rx) = mpsc::channel(4);
    drop(event_rx);

    let report = orchestrator(
        code_provider(),
        log_provider(),
        Arc::new(ScriptedReasoner::always(Ok(Analysis::complete("x", 0.9)))),
        Arc::new(ScriptedReviewer::approving()),
    )
    .with_event_sender(event_tx)
    .run_session(payments_ticket(), config().build().unwrap())
    .await
    .unwrap();

    assert_eq!(report.termination_reason, TerminationReason::Approved);
}
