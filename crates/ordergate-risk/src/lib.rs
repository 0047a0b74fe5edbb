//! Pre-trade risk engine for the ordergate trading control core.
//!
//! Evaluates every order against the configured institutional limits
//! before it may execute, owns the kill switch, and maintains the
//! daily volume counter.

pub mod engine;
pub mod error;

pub use engine::{RiskDecision, RiskEngine};
pub use error::{RiskError, RiskResult};
