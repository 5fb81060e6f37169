//! Session Configuration & Builder
//!
//! `SessionConfig` carries every limit a session enforces. The core assumes no
//! defaults for budget limits or store caps: they must be supplied, either
//! through `SessionConfigBuilder` or a TOML file.
//!
//! ## Builder
//!
//! 1. Create with `SessionConfigBuilder::new()`
//! 2. Chain `.field(value)` calls
//! 3. Call `.build()` which validates and returns `CoreResult<SessionConfig>`
//!
//! ## TOML
//!
//! ```toml
//! max_iterations = 6
//! max_duration_secs = 600
//! max_evidence_volume = 2_000_000
//! max_total_gather_failures = 2
//! max_review_revisions = 2
//! store_max_fragments = 200
//! store_max_bytes = 500_000
//! provider_timeout_ms = 30_000
//! # optional, defaults to 900, at most one week
//! initial_window_padding_secs = 900
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Default widening applied to the ticket's time window for the first log search.
pub const DEFAULT_WINDOW_PADDING_SECS: u64 = 15 * 60;

/// Largest accepted window padding: one week.
pub const MAX_WINDOW_PADDING_SECS: u64 = 7 * 24 * 60 * 60;

fn default_window_padding() -> u64 {
    DEFAULT_WINDOW_PADDING_SECS
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Validated limits for one orchestration session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Maximum reasoning passes
    pub max_iterations: u32,
    /// Maximum wall-clock time, in seconds
    pub max_duration_secs: u64,
    /// Maximum evidence bytes ingested over the session
    pub max_evidence_volume: u64,
    /// Consecutive all-requests-failed gather steps before giving up
    pub max_total_gather_failures: u32,
    /// Maximum re-reasoning passes triggered by reviewer rejections
    pub max_review_revisions: u32,
    /// Fragment count cap of the evidence store
    pub store_max_fragments: usize,
    /// Content byte cap of the evidence store
    pub store_max_bytes: usize,
    /// Timeout applied to each individual provider call, in milliseconds
    pub provider_timeout_ms: u64,
    /// Widening applied to the ticket window for the initial log request
    #[serde(default = "default_window_padding")]
    pub initial_window_padding_secs: u64,
}

impl SessionConfig {
    /// Start building a configuration.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check every limit is usable.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_iterations == 0 {
            return Err(CoreError::validation("max_iterations must be > 0"));
        }
        if self.max_duration_secs == 0 {
            return Err(CoreError::validation("max_duration_secs must be > 0"));
        }
        if self.max_evidence_volume == 0 {
            return Err(CoreError::validation("max_evidence_volume must be > 0"));
        }
        if self.max_total_gather_failures == 0 {
            return Err(CoreError::validation(
                "max_total_gather_failures must be > 0",
            ));
        }
        if self.store_max_fragments == 0 {
            return Err(CoreError::validation("store_max_fragments must be > 0"));
        }
        if self.store_max_bytes == 0 {
            return Err(CoreError::validation("store_max_bytes must be > 0"));
        }
        if self.provider_timeout_ms == 0 {
            return Err(CoreError::validation("provider_timeout_ms must be > 0"));
        }
        if self.initial_window_padding_secs > MAX_WINDOW_PADDING_SECS {
            return Err(CoreError::validation(format!(
                "initial_window_padding_secs must be <= {}",
                MAX_WINDOW_PADDING_SECS
            )));
        }
        Ok(())
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Padding for the initial log window, clamped to `MAX_WINDOW_PADDING_SECS`.
    pub fn initial_window_padding(&self) -> chrono::Duration {
        let secs = self.initial_window_padding_secs.min(MAX_WINDOW_PADDING_SECS);
        chrono::Duration::seconds(secs as i64)
    }
}

// ============================================================================
// SessionConfigBuilder
// ============================================================================

/// Builder for `SessionConfig` with validation at build time.
///
/// # Example
/// ```ignore
/// let config = SessionConfigBuilder::new()
///     .max_iterations(5)
///     .max_duration(Duration::from_secs(300))
///     .max_evidence_volume(1_000_000)
///     .max_total_gather_failures(2)
///     .max_review_revisions(2)
///     .store_caps(200, 500_000)
///     .provider_timeout(Duration::from_secs(20))
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    max_iterations: Option<u32>,
    max_duration: Option<Duration>,
    max_evidence_volume: Option<u64>,
    max_total_gather_failures: Option<u32>,
    max_review_revisions: Option<u32>,
    store_max_fragments: Option<usize>,
    store_max_bytes: Option<usize>,
    provider_timeout: Option<Duration>,
    initial_window_padding: Option<Duration>,
}

impl SessionConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum reasoning passes (required, > 0).
    pub fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Set maximum wall-clock duration (required, at least one second).
    pub fn max_duration(mut self, d: Duration) -> Self {
        self.max_duration = Some(d);
        self
    }

    /// Set maximum ingested evidence bytes (required, > 0).
    pub fn max_evidence_volume(mut self, bytes: u64) -> Self {
        self.max_evidence_volume = Some(bytes);
        self
    }

    /// Set the consecutive total gather failure limit (required, > 0).
    pub fn max_total_gather_failures(mut self, n: u32) -> Self {
        self.max_total_gather_failures = Some(n);
        self
    }

    /// Set the review revision limit (required, may be 0).
    pub fn max_review_revisions(mut self, n: u32) -> Self {
        self.max_review_revisions = Some(n);
        self
    }

    /// Set the evidence store caps (required, both > 0).
    pub fn store_caps(mut self, max_fragments: usize, max_bytes: usize) -> Self {
        self.store_max_fragments = Some(max_fragments);
        self.store_max_bytes = Some(max_bytes);
        self
    }

    /// Set the per-call provider timeout (required, at least one millisecond).
    pub fn provider_timeout(mut self, d: Duration) -> Self {
        self.provider_timeout = Some(d);
        self
    }

    /// Set the initial log window padding (optional).
    pub fn initial_window_padding(mut self, d: Duration) -> Self {
        self.initial_window_padding = Some(d);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> CoreResult<SessionConfig> {
        let config = SessionConfig {
            max_iterations: required(self.max_iterations, "max_iterations")?,
            max_duration_secs: required(self.max_duration, "max_duration")?.as_secs(),
            max_evidence_volume: required(self.max_evidence_volume, "max_evidence_volume")?,
            max_total_gather_failures: required(
                self.max_total_gather_failures,
                "max_total_gather_failures",
            )?,
            max_review_revisions: required(self.max_review_revisions, "max_review_revisions")?,
            store_max_fragments: required(self.store_max_fragments, "store_max_fragments")?,
            store_max_bytes: required(self.store_max_bytes, "store_max_bytes")?,
            provider_timeout_ms: required(self.provider_timeout, "provider_timeout")?.as_millis()
                as u64,
            initial_window_padding_secs: self
                .initial_window_padding
                .map(|d| d.as_secs())
                .unwrap_or(DEFAULT_WINDOW_PADDING_SECS),
        };
        config.validate()?;
        Ok(config)
    }
}

fn required<T>(value: Option<T>, name: &str) -> CoreResult<T> {
    value.ok_or_else(|| CoreError::validation(format!("{} is required", name)))
}

// ============================================================================
// Tests
// ============================================================================
