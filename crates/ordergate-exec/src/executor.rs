//! The downstream executor seam.
//!
//! The pipeline is generic over anything that can attempt a fill. The
//! default implementation simulates a venue: a small latency, a
//! configurable failure probability, and a bounded price slippage.

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::trace;

use ordergate_core::{Fill, Order, Price};

use crate::error::ExecError;

/// Adapter to the market-side execution mechanism.
///
/// Implementations classify failures as transient (retryable) or
/// permanent via `ExecError`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, order: &Order) -> Result<Fill, ExecError>;
}

/// Simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Simulated venue latency per attempt.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Probability in [0, 1] that an attempt fails transiently.
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
}

fn default_latency_ms() -> u64 {
    100
}

fn default_failure_rate() -> f64 {
    0.1
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            failure_rate: default_failure_rate(),
        }
    }
}

/// Simulated market executor.
///
/// Fills at the limit price adjusted by a uniform slippage of at most
/// ±10 basis points.
pub struct SimulatedExecutor {
    config: SimulatorConfig,
}

impl SimulatedExecutor {
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Executor for SimulatedExecutor {
    async fn execute(&self, order: &Order) -> Result<Fill, ExecError> {
        tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;

        let (failed, slip_bps) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen::<f64>() < self.config.failure_rate,
                rng.gen_range(-10i64..=10),
            )
        };

        if failed {
            return Err(ExecError::Transient(
                "simulated venue temporarily unavailable".to_string(),
            ));
        }

        let slip = Decimal::from(slip_bps) / Decimal::from(10_000);
        let fill_price = Price::new(order.limit_price.inner() * (Decimal::ONE + slip));

        trace!(
            order_id = %order.order_id,
            fill_price = %fill_price,
            slip_bps,
            "simulated fill"
        );

        Ok(Fill::new(fill_price, order.quantity))
    }
}
