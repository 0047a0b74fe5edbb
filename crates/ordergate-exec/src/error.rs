//! Error types for ordergate-exec.

use thiserror::Error;

/// A failed downstream execution attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    /// Expected to resolve without operator action (timeout, venue
    /// temporarily unavailable, rate limit). Eligible for retry.
    #[error("transient execution failure: {0}")]
    Transient(String),

    /// Downstream rejected the order for a business reason. Not
    /// retried.
    #[error("permanent execution failure: {0}")]
    Permanent(String),
}

impl ExecError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
