//! Error types for ordergate-core.

use thiserror::Error;

/// Core validation errors. All are permanent: the submission or
/// configuration change is rejected synchronously.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
