//! Circuit breaker guarding the downstream executor.
//!
//! Closed until `failure_threshold` consecutive pipeline failures,
//! then open for `open_duration`. The first admission after expiry is
//! a half-open probe; its outcome decides between closing and
//! re-opening. Exactly one probe is admitted per open cycle.
//!
//! Time-dependent paths take an explicit `now_ms` through the `*_at`
//! variants so tests control the clock; the plain methods use the
//! system clock.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ordergate_telemetry::metrics::BREAKER_TRANSITIONS_TOTAL;

/// Breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting a probe.
    #[serde(default = "default_open_duration_ms")]
    pub open_duration_ms: u64,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_open_duration_ms() -> u64 {
    60_000
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_duration_ms: default_open_duration_ms(),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    fn label(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Result of asking the breaker for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected,
}

impl Admission {
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    /// Unix ms at which an open breaker may admit a probe.
    open_expires_at_ms: u64,
    /// A half-open probe has been admitted and not yet resolved.
    probe_inflight: bool,
}

/// Consecutive-failure circuit breaker.
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                open_expires_at_ms: 0,
                probe_inflight: false,
            }),
        }
    }

    /// Ask for admission using the system clock.
    pub fn allow(&self) -> Admission {
        self.allow_at(now_ms())
    }

    /// Ask for admission at the given timestamp.
    pub fn allow_at(&self, now_ms: u64) -> Admission {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => Admission::Admitted,
            BreakerState::Open => {
                if now_ms >= inner.open_expires_at_ms {
                    Self::transition(&mut inner, BreakerState::HalfOpen);
                    inner.probe_inflight = true;
                    info!("circuit breaker half-open, probe admitted");
                    Admission::Admitted
                } else {
                    Admission::Rejected
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_inflight {
                    Admission::Rejected
                } else {
                    inner.probe_inflight = true;
                    Admission::Admitted
                }
            }
        }
    }

    /// Record a successful downstream outcome.
    pub fn record_success(&self) {
        self.record_success_at(now_ms())
    }

    pub fn record_success_at(&self, _now_ms: u64) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.probe_inflight = false;
        if inner.state != BreakerState::Closed {
            Self::transition(&mut inner, BreakerState::Closed);
            info!("circuit breaker closed");
        }
    }

    /// Record a failed downstream outcome.
    pub fn record_failure(&self) {
        self.record_failure_at(now_ms())
    }

    pub fn record_failure_at(&self, now_ms: u64) {
        let mut inner = self.inner.lock();
        inner.probe_inflight = false;
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.open_expires_at_ms = now_ms + self.config.open_duration_ms;
                    Self::transition(&mut inner, BreakerState::Open);
                    warn!(
                        consecutive_failures = inner.consecutive_failures,
                        open_ms = self.config.open_duration_ms,
                        "circuit breaker opened"
                    );
                }
            }
            BreakerState::HalfOpen => {
                // Probe failed: back to open with a fresh expiry.
                inner.open_expires_at_ms = now_ms + self.config.open_duration_ms;
                Self::transition(&mut inner, BreakerState::Open);
                warn!("circuit breaker probe failed, re-opened");
            }
            BreakerState::Open => {
                // No admissions happen while open; nothing to count.
            }
        }
    }

    /// Current state, for metrics and health reporting.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    /// Current consecutive-failure count.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    fn transition(inner: &mut BreakerInner, to: BreakerState) {
        inner.state = to;
        BREAKER_TRANSITIONS_TOTAL
            .with_label_values(&[to.label()])
            .inc();
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}
