//! Asynchronous execution for the ordergate trading control core.
//!
//! Wraps the fallible downstream executor in idempotency, bounded
//! retries with exponential backoff, a per-attempt timeout, and a
//! circuit breaker. Every terminal outcome is journaled.

pub mod breaker;
pub mod error;
pub mod executor;
pub mod idempotency;
pub mod pipeline;

pub use breaker::{Admission, BreakerConfig, BreakerState, CircuitBreaker};
pub use error::ExecError;
pub use executor::{Executor, SimulatedExecutor, SimulatorConfig};
pub use idempotency::{Claim, Fingerprint, IdempotencyIndex};
pub use pipeline::{ExecutionOutcome, ExecutionPipeline, PipelineConfig};
