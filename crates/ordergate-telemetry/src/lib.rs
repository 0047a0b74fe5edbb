//! Observability for the ordergate trading control core.
//!
//! Structured logging initialization and Prometheus metrics shared by
//! every component.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::gather_metrics;
