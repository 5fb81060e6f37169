//! Analysis & Review Models
//!
//! Output contracts of the Reasoner and Reviewer capabilities.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::evidence::EvidenceRequest;

/// Whether the reasoner converged or wants more evidence.
///
/// Exactly one of the two is populated; `NeedsEvidence` must carry at least
/// one request (see [`Analysis::validate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Evidence is sufficient; `root_cause` is the proposed answer
    Complete,
    /// Evidence is insufficient; gather these before reasoning again
    NeedsEvidence { requests: Vec<EvidenceRequest> },
}

/// Reasoner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Narrative root-cause explanation (may be tentative when incomplete)
    pub root_cause: String,
    /// Self-reported confidence in [0, 1]
    pub confidence: f32,
    /// Intermediate reasoning notes, kept in the session transcript
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
    /// Convergence signal
    pub outcome: AnalysisOutcome,
}

impl Analysis {
    /// A converged analysis.
    pub fn complete(root_cause: impl Into<String>, confidence: f32) -> Self {
        Self {
            root_cause: root_cause.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: String::new(),
            outcome: AnalysisOutcome::Complete,
        }
    }

    /// An analysis asking for more evidence.
    pub fn needs_evidence(
        root_cause: impl Into<String>,
        confidence: f32,
        requests: Vec<EvidenceRequest>,
    ) -> Self {
        Self {
            root_cause: root_cause.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: String::new(),
            outcome: AnalysisOutcome::NeedsEvidence { requests },
        }
    }

    /// Attach reasoning notes.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Whether the reasoner declared convergence.
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Complete)
    }

    /// Requested follow-up evidence (empty when complete).
    pub fn requests(&self) -> &[EvidenceRequest] {
        match &self.outcome {
            AnalysisOutcome::Complete => &[],
            AnalysisOutcome::NeedsEvidence { requests } => requests,
        }
    }

    /// Check the output contract.
    pub fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(CoreError::validation(format!(
                "confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )));
        }
        if let AnalysisOutcome::NeedsEvidence { requests } = &self.outcome {
            if requests.is_empty() {
                return Err(CoreError::validation(
                    "analysis asks for more evidence but lists no requests",
                ));
            }
            if requests.iter().any(|r| r.query.trim().is_empty()) {
                return Err(CoreError::validation("evidence request has an empty query"));
            }
        }
        Ok(())
    }
}

/// Reviewer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    /// Whether the analysis is accepted as the final answer
    pub approved: bool,
    /// Why the analysis was rejected; forwarded to the next reasoning pass
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    /// Evidence the reviewer wants gathered before the next pass
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_requests: Vec<EvidenceRequest>,
    /// Reviewer's own notes, kept in the session transcript
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
}

impl ReviewVerdict {
    /// Accept the analysis.
    pub fn approve() -> Self {
        Self {
            approved: true,
            reasons: Vec::new(),
            evidence_requests: Vec::new(),
            reasoning: String::new(),
        }
    }

    /// Reject the analysis with revision reasons.
    pub fn reject(reasons: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            approved: false,
            reasons: reasons.into_iter().map(Into::into).collect(),
            evidence_requests: Vec::new(),
            reasoning: String::new(),
        }
    }

    /// Ask for more evidence alongside a rejection.
    pub fn with_evidence_requests(mut self, requests: Vec<EvidenceRequest>) -> Self {
        self.evidence_requests = requests;
        self
    }

    /// Attach reasoning notes.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}
