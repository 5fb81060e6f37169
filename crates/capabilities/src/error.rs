//! Capability Errors
//!
//! Failures raised by search providers, reasoners and reviewers. The
//! orchestrator decides what a failure means: provider failures are absorbed
//! into gather statistics, reasoner/reviewer failures end the session.

use thiserror::Error;

/// Error returned by any capability call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    /// Backend not reachable or not configured
    #[error("Capability unavailable: {message}")]
    Unavailable { message: String },

    /// Backend did not answer in time
    #[error("Capability timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Backend answered with something unusable
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Output violates the capability's contract (e.g. empty request list)
    #[error("Contract violation: {message}")]
    ContractViolation { message: String },

    /// Anything else
    #[error("{message}")]
    Other { message: String },
}

/// Result type alias for capability calls
pub type CapabilityResult<T> = Result<T, CapabilityError>;

impl CapabilityError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self::ContractViolation {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<oncall_rca_core::CoreError> for CapabilityError {
    fn from(err: oncall_rca_core::CoreError) -> Self {
        Self::ContractViolation {
            message: err.to_string(),
        }
    }
}
