//! Error types for martingale-sim.
//!
//! All fallible operations return `Result<T, SimError>` instead of panicking.
//! The domain has no transient failures: every error is a caller error that
//! is surfaced before any simulation work starts.

use thiserror::Error;

/// Result type alias for martingale-sim operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all martingale-sim operations.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Domain Errors =====
    /// Batch or trial parameters violate their preconditions.
    #[error("Invalid parameters: {message}")]
    InvalidParameters {
        /// Description of the violated precondition.
        message: String,
    },

    /// Outcome space contains a label outside {RED, BLACK, ZERO}.
    #[error("Invalid outcome space: {message}")]
    InvalidOutcomeSpace {
        /// Description of the offending labels.
        message: String,
    },

    // ===== Configuration Errors =====
    /// Invalid configuration document.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Schema validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SimError {
    /// Create an invalid-parameters error with a message.
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create an invalid-outcome-space error with a message.
    #[must_use]
    pub fn invalid_outcome_space(message: impl Into<String>) -> Self {
        Self::InvalidOutcomeSpace {
            message: message.into(),
        }
    }

    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}
