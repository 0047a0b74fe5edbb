//! Order lifecycle coordination for the ordergate trading control core.
//!
//! The coordinator is the single writer of order status: it drives
//! every submission through validation, idempotency, and pre-trade
//! risk synchronously, then hands approved orders to the execution
//! pipeline on a bounded worker pool.

pub mod coordinator;
pub mod error;

pub use coordinator::{CoordinatorConfig, OrderCoordinator, SubmitResponse};
pub use error::{SubmitError, SubmitResult};
