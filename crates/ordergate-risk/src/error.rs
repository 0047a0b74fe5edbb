//! Error types for ordergate-risk.

use thiserror::Error;

/// Risk configuration and journaling errors.
///
/// Limit *violations* are not errors: `RiskEngine::check` returns a
/// decision. These errors cover invalid configuration updates and
/// journal failures while recording configuration changes.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("configuration update requires a non-empty actor identity")]
    EmptyActor,

    #[error(transparent)]
    Config(#[from] ordergate_core::CoreError),

    #[error(transparent)]
    Journal(#[from] ordergate_journal::JournalError),
}

/// Result type alias for risk operations.
pub type RiskResult<T> = Result<T, RiskError>;
