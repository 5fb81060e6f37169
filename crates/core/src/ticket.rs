//! Ticket Model
//!
//! The structured problem report that drives one analysis session. Tickets are
//! produced by an external extractor (chat bot, alert router) and are never
//! mutated once a session starts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A UTC time range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::validation(format!(
                "time window ends before it starts ({} < {})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// A window centred on a single reported instant.
    pub fn around(instant: DateTime<Utc>, radius: Duration) -> Self {
        Self { start: instant, end: instant }.padded(radius)
    }

    /// Widen the window by `padding` on both sides.
    ///
    /// A side that would leave chrono's representable range keeps its
    /// original bound.
    pub fn padded(&self, padding: Duration) -> Self {
        Self {
            start: self.start.checked_sub_signed(padding).unwrap_or(self.start),
            end: self.end.checked_add_signed(padding).unwrap_or(self.end),
        }
    }

    /// Check whether an instant falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Immutable structured problem report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// External identifier (chat thread, alert id, ...)
    pub id: String,
    /// Free-text-derived summary of the report
    pub summary: String,
    /// Services the reporter believes are affected
    #[serde(default)]
    pub services: Vec<String>,
    /// Observed symptom, e.g. "5xx spike"
    pub symptom: String,
    /// When the problem was observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
}

impl Ticket {
    /// Create a ticket with no services and no time window.
    pub fn new(
        id: impl Into<String>,
        summary: impl Into<String>,
        symptom: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            services: Vec::new(),
            symptom: symptom.into(),
            time_window: None,
        }
    }

    /// Add an affected service.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.services.push(service.into());
        self
    }

    /// Set the observation window.
    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// The declared window widened by `padding`, if the ticket has one.
    ///
    /// Reporters rarely know the exact minute a problem started, so the
    /// initial log search looks a little before and after what was declared.
    pub fn scope_window(&self, padding: Duration) -> Option<TimeWindow> {
        self.time_window.map(|w| w.padded(padding))
    }

    /// Services joined for display, or `"unspecified"`.
    pub fn services_label(&self) -> String {
        if self.services.is_empty() {
            "unspecified".to_string()
        } else {
            self.services.join(", ")
        }
    }
}
