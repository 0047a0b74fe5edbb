//! Prometheus metrics for the trading control core.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally: a registration
//! failure means duplicate metric names, a fatal configuration error
//! that should crash at startup rather than fail silently. These
//! panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Gauge, Histogram,
    TextEncoder,
};

use crate::error::TelemetryResult;

/// Order submissions by synchronous outcome.
/// Labels: outcome (approved/rejected/duplicate/invalid)
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ordergate_orders_submitted_total",
        "Order submissions by synchronous outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Risk violations observed in pre-trade checks.
/// Labels: violation (POSITION_LIMIT/...)
pub static RISK_VIOLATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ordergate_risk_violations_total",
        "Risk limit violations by type",
        &["violation"]
    )
    .unwrap()
});

/// Execution pipeline terminal outcomes.
/// Labels: outcome (executed/failed/breaker_open/duplicate)
pub static EXECUTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ordergate_executions_total",
        "Execution pipeline terminal outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Downstream executor attempts per order.
pub static EXECUTION_ATTEMPTS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "ordergate_execution_attempts",
        "Executor attempts consumed per completed pipeline run",
        vec![1.0, 2.0, 3.0, 4.0, 5.0]
    )
    .unwrap()
});

/// Circuit breaker state transitions.
/// Labels: to (closed/open/half_open)
pub static BREAKER_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ordergate_breaker_transitions_total",
        "Circuit breaker state transitions",
        &["to"]
    )
    .unwrap()
});

/// Daily accepted-order volume in USD notional.
pub static DAILY_VOLUME_USD: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "ordergate_daily_volume_usd",
        "Accepted-order notional accumulated today (UTC)"
    )
    .unwrap()
});

/// Journal size in events.
pub static JOURNAL_EVENTS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "ordergate_journal_events",
        "Number of events held by the journal"
    )
    .unwrap()
});

/// Encode the default registry in Prometheus text exposition format.
pub fn gather_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    Ok(encoder.encode_to_string(&families)?)
}
