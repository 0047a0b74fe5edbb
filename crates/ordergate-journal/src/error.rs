//! Error types for ordergate-journal.

use thiserror::Error;

/// Journal errors.
///
/// An append failure is fatal to the order in progress: the caller
/// must surface it as an internal error and leave the order for
/// operator intervention.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal capacity exceeded ({capacity} events)")]
    CapacityExceeded { capacity: usize },

    #[error("audit export failed: {0}")]
    Export(#[from] std::io::Error),

    #[error("audit serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
