//! Budget Controller
//!
//! Tracks the three session budgets: reasoning passes, wall-clock time and
//! evidence volume. Advisory only; the state machine decides what to do once
//! a limit is reached.

use std::time::Duration;

use tokio::time::Instant;

use oncall_rca_core::SessionConfig;

/// Which budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLimit {
    Iterations,
    Duration,
    EvidenceVolume,
}

impl std::fmt::Display for BudgetLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetLimit::Iterations => write!(f, "max_iterations"),
            BudgetLimit::Duration => write!(f, "max_duration"),
            BudgetLimit::EvidenceVolume => write!(f, "max_evidence_volume"),
        }
    }
}

/// Per-session budget tracker.
#[derive(Debug, Clone)]
pub struct BudgetController {
    max_iterations: u32,
    max_duration: Duration,
    max_evidence_volume: u64,
    started_at: Instant,
    iterations: u32,
    evidence_volume: u64,
}

impl BudgetController {
    /// Start the clock with explicit limits.
    pub fn new(max_iterations: u32, max_duration: Duration, max_evidence_volume: u64) -> Self {
        Self {
            max_iterations,
            max_duration,
            max_evidence_volume,
            started_at: Instant::now(),
            iterations: 0,
            evidence_volume: 0,
        }
    }

    /// Start the clock with the limits of a session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.max_iterations,
            config.max_duration(),
            config.max_evidence_volume,
        )
    }

    /// Count one reasoning pass and return the new total.
    pub fn record_iteration(&mut self) -> u32 {
        self.iterations += 1;
        self.iterations
    }

    /// Record the store's lifetime ingested byte count.
    pub fn record_evidence_volume(&mut self, ingested_bytes: u64) {
        self.evidence_volume = self.evidence_volume.max(ingested_bytes);
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn evidence_volume(&self) -> u64 {
        self.evidence_volume
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// The first limit reached, checked in iteration, time, volume order.
    pub fn exhaustion(&self) -> Option<BudgetLimit> {
        if self.iterations >= self.max_iterations {
            Some(BudgetLimit::Iterations)
        } else if self.elapsed() >= self.max_duration {
            Some(BudgetLimit::Duration)
        } else if self.evidence_volume >= self.max_evidence_volume {
            Some(BudgetLimit::EvidenceVolume)
        } else {
            None
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhaustion().is_some()
    }
}
