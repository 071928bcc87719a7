//! Result and error types for Sondar.

use crate::locator::TargetDescriptor;
use thiserror::Error;

/// Result type for Sondar operations
pub type SondarResult<T> = Result<T, SondarError>;

/// Errors that can occur in Sondar
#[derive(Debug, Error)]
pub enum SondarError {
    /// Every strategy of a target descriptor missed
    #[error("Element not found: {descriptor}")]
    ElementNotFound {
        /// The descriptor that was tried, in priority order
        descriptor: TargetDescriptor,
    },

    /// A polled condition never became true within its budget
    #[error("Condition timed out after {timeout_ms}ms ({polls} polls): {description}")]
    ConditionTimeout {
        /// What was being waited for
        description: String,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
        /// Time actually spent waiting
        elapsed_ms: u64,
        /// Number of predicate evaluations
        polls: u32,
    },

    /// Descriptor has no strategies
    #[error("Invalid target descriptor: {message}")]
    InvalidDescriptor {
        /// Error message
        message: String,
    },

    /// Condition spec violates interval/timeout invariants
    #[error("Invalid condition: {message}")]
    InvalidCondition {
        /// Error message
        message: String,
    },

    /// A single driver call failed; callers retrying per attempt absorb this
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// The underlying device session is gone
    #[error("Driver session lost: {message}")]
    SessionLost {
        /// Error message
        message: String,
    },

    /// A scripted expectation did not hold
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SondarError {
    /// Create a transient driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a session-lost error
    #[must_use]
    pub fn session_lost(message: impl Into<String>) -> Self {
        Self::SessionLost {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Whether this error must abort retry loops instead of being absorbed.
    ///
    /// Only a lost session is fatal: every other fault seen during a single
    /// resolution, poll tick or gesture counts as a failed attempt.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionLost { .. })
    }
}
