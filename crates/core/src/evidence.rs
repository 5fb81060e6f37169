//! Evidence Models
//!
//! Retrieved code and log context, the requests that retrieve it, and the
//! read-only snapshot handed to reasoning and review.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::TimeWindow;

// ============================================================================
// EvidenceKind
// ============================================================================

/// Which search provider a fragment or request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Code,
    Log,
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceKind::Code => write!(f, "code"),
            EvidenceKind::Log => write!(f, "log"),
        }
    }
}

// ============================================================================
// EvidenceLocator
// ============================================================================

/// Where a fragment came from. Two fragments with equal locators are the
/// same evidence, whatever their content or score.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EvidenceLocator {
    /// A line range within a source file (1-based, inclusive)
    Code {
        path: String,
        start_line: u32,
        end_line: u32,
    },
    /// A slice of a log stream
    Log {
        stream: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl EvidenceLocator {
    /// Kind implied by the locator shape.
    pub fn kind(&self) -> EvidenceKind {
        match self {
            EvidenceLocator::Code { .. } => EvidenceKind::Code,
            EvidenceLocator::Log { .. } => EvidenceKind::Log,
        }
    }
}

impl std::fmt::Display for EvidenceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceLocator::Code {
                path,
                start_line,
                end_line,
            } => write!(f, "{}:{}-{}", path, start_line, end_line),
            EvidenceLocator::Log { stream, start, end } => write!(
                f,
                "{}@{}..{}",
                stream,
                start.format("%Y-%m-%dT%H:%M:%SZ"),
                end.format("%Y-%m-%dT%H:%M:%SZ")
            ),
        }
    }
}

// ============================================================================
// EvidenceFragment
// ============================================================================

/// One retrieved piece of code or log context. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceFragment {
    /// Source locator (also determines the kind)
    pub locator: EvidenceLocator,
    /// Retrieved text
    pub content: String,
    /// Provider-assigned relevance; higher is more relevant
    pub relevance: f64,
    /// When the provider returned this fragment
    pub retrieved_at: DateTime<Utc>,
}

impl EvidenceFragment {
    /// Create a fragment stamped with the current time.
    pub fn new(locator: EvidenceLocator, content: impl Into<String>, relevance: f64) -> Self {
        Self {
            locator,
            content: content.into(),
            relevance,
            retrieved_at: Utc::now(),
        }
    }

    /// Create a code fragment.
    pub fn code(
        path: impl Into<String>,
        start_line: u32,
        end_line: u32,
        content: impl Into<String>,
        relevance: f64,
    ) -> Self {
        Self::new(
            EvidenceLocator::Code {
                path: path.into(),
                start_line,
                end_line,
            },
            content,
            relevance,
        )
    }

    /// Create a log fragment.
    pub fn log(
        stream: impl Into<String>,
        window: TimeWindow,
        content: impl Into<String>,
        relevance: f64,
    ) -> Self {
        Self::new(
            EvidenceLocator::Log {
                stream: stream.into(),
                start: window.start,
                end: window.end,
            },
            content,
            relevance,
        )
    }

    /// Override the retrieval timestamp.
    pub fn retrieved_at(mut self, at: DateTime<Utc>) -> Self {
        self.retrieved_at = at;
        self
    }

    /// Fragment kind, derived from the locator.
    pub fn kind(&self) -> EvidenceKind {
        self.locator.kind()
    }

    /// Content size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Relevance usable for ordering: NaN sorts below everything.
    pub fn rank_score(&self) -> f64 {
        if self.relevance.is_nan() {
            f64::NEG_INFINITY
        } else {
            self.relevance
        }
    }
}

// ============================================================================
// EvidenceRequest
// ============================================================================

/// A query routed to one provider kind. Lives for a single gather step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceRequest {
    /// Target provider
    pub kind: EvidenceKind,
    /// What to look for
    pub query: String,
    /// Services the search should be scoped to (empty = provider's choice)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    /// Time range the search should be scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
}

impl EvidenceRequest {
    /// Create an unscoped request.
    pub fn new(kind: EvidenceKind, query: impl Into<String>) -> Self {
        Self {
            kind,
            query: query.into(),
            services: Vec::new(),
            time_window: None,
        }
    }

    /// Create an unscoped code request.
    pub fn code(query: impl Into<String>) -> Self {
        Self::new(EvidenceKind::Code, query)
    }

    /// Create an unscoped log request.
    pub fn log(query: impl Into<String>) -> Self {
        Self::new(EvidenceKind::Log, query)
    }

    /// Scope the request to services.
    pub fn with_services(mut self, services: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }

    /// Scope the request to a time window.
    pub fn with_time_window(mut self, window: Option<TimeWindow>) -> Self {
        self.time_window = window;
        self
    }

    /// Key used to coalesce duplicate requests within one gather step.
    pub fn coalesce_key(&self) -> (EvidenceKind, &str) {
        (self.kind, self.query.trim())
    }
}

// ============================================================================
// EvidenceSnapshot
// ============================================================================

/// Read-only ordered view of a session's evidence.
///
/// Cloning is cheap; the fragments are shared, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    fragments: Arc<[EvidenceFragment]>,
}

impl EvidenceSnapshot {
    /// Build a snapshot from fragments in retrieval order.
    pub fn new(fragments: Vec<EvidenceFragment>) -> Self {
        Self {
            fragments: fragments.into(),
        }
    }

    /// Fragments in retrieval order.
    pub fn fragments(&self) -> &[EvidenceFragment] {
        &self.fragments
    }

    /// Iterate fragments in retrieval order.
    pub fn iter(&self) -> std::slice::Iter<'_, EvidenceFragment> {
        self.fragments.iter()
    }

    /// Fragments of one kind, in retrieval order.
    pub fn of_kind(&self, kind: EvidenceKind) -> impl Iterator<Item = &EvidenceFragment> {
        self.fragments.iter().filter(move |f| f.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Aggregate content bytes.
    pub fn total_bytes(&self) -> usize {
        self.fragments.iter().map(EvidenceFragment::size).sum()
    }
}

impl<'a> IntoIterator for &'a EvidenceSnapshot {
    type Item = &'a EvidenceFragment;
    type IntoIter = std::slice::Iter<'a, EvidenceFragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.iter()
    }
}
