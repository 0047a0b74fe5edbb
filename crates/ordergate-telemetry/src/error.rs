//! Error types for ordergate-telemetry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("logging initialization failed: {0}")]
    Init(String),

    #[error("metrics encoding failed: {0}")]
    Encode(#[from] prometheus::Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
