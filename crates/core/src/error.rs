//! Core Error Types
//!
//! Defines the foundational error types used across the oncall RCA workspace.
//! These error types depend only on thiserror and toml so the data model and
//! configuration can be validated without pulling in the runtime.
//!
//! Orchestration outcomes are never reported through these errors: a session
//! always ends in a `Report`. `CoreError` covers configuration loading and
//! validation of inputs before a session starts.

use thiserror::Error;

/// Core error type for the oncall RCA workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// TOML parse errors, including missing keys
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
