//! Error types for ordergate-coordinator.

use thiserror::Error;

use ordergate_core::OrderId;

/// Synchronous submission failures.
///
/// Risk rejections are not errors: they return a `SubmitResponse` with
/// `REJECTED` status, since the submission itself was processed.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Malformed order; permanent, nothing was created.
    #[error(transparent)]
    Validation(#[from] ordergate_core::CoreError),

    /// Idempotency fingerprint already claimed by a prior order.
    #[error("duplicate submission; original order {prior_order_id}")]
    Duplicate { prior_order_id: OrderId },

    /// Journal append failed; the order's state is undefined and
    /// requires operator intervention.
    #[error(transparent)]
    Journal(#[from] ordergate_journal::JournalError),
}

/// Result type alias for submission operations.
pub type SubmitResult<T> = Result<T, SubmitError>;
