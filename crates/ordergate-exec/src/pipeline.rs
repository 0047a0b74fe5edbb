//! The execution pipeline.
//!
//! Drives an approved order through the downstream executor with
//! idempotency, a circuit breaker, bounded retries with exponential
//! backoff, and per-attempt timeouts. Every terminal outcome is
//! journaled; a completed fill is applied to the position book with
//! its `POSITION_UPDATED` event appended immediately after
//! `EXECUTION_COMPLETED`.
//!
//! No lock is held across an executor call; the only suspension points
//! are the executor invocation, the attempt timeout, and the backoff
//! sleeps.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Duration};
use tracing::{error, info, warn};

use ordergate_core::{
    EventDraft, EventKind, ExecutionFailureKind, Fill, Order, OrderId,
};
use ordergate_journal::{EventLog, JournalResult};
use ordergate_position::PositionBook;
use ordergate_telemetry::metrics::{EXECUTIONS_TOTAL, EXECUTION_ATTEMPTS};

use crate::breaker::CircuitBreaker;
use crate::error::ExecError;
use crate::executor::Executor;
use crate::idempotency::{Claim, Fingerprint, IdempotencyIndex};

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Executor attempts per order, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Deadline for a single executor attempt.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Backoff before retry n is `backoff_base_ms * 2^(n-1)`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_attempt_timeout_ms() -> u64 {
    5_000
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// Terminal outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Executed(Fill),
    Failed {
        kind: ExecutionFailureKind,
        reason: String,
    },
    /// The fingerprint was already claimed by another order.
    Duplicate(OrderId),
}

/// Asynchronous execution stage for approved orders.
pub struct ExecutionPipeline {
    journal: Arc<EventLog>,
    book: Arc<PositionBook>,
    breaker: Arc<CircuitBreaker>,
    idempotency: Arc<IdempotencyIndex>,
    executor: Arc<dyn Executor>,
    config: PipelineConfig,
}

impl ExecutionPipeline {
    #[must_use]
    pub fn new(
        journal: Arc<EventLog>,
        book: Arc<PositionBook>,
        breaker: Arc<CircuitBreaker>,
        idempotency: Arc<IdempotencyIndex>,
        executor: Arc<dyn Executor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            journal,
            book,
            breaker,
            idempotency,
            executor,
            config,
        }
    }

    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    #[must_use]
    pub fn idempotency(&self) -> &Arc<IdempotencyIndex> {
        &self.idempotency
    }

    /// Run an approved order to a terminal outcome.
    ///
    /// A journal failure aborts the run and is fatal to the order in
    /// progress: the error propagates and the order is left for
    /// operator intervention.
    pub async fn process(&self, order: &Order) -> JournalResult<ExecutionOutcome> {
        if let Claim::Duplicate(prior) =
            self.idempotency.claim(Fingerprint::of(order), order.order_id)
        {
            EXECUTIONS_TOTAL.with_label_values(&["duplicate"]).inc();
            return Ok(ExecutionOutcome::Duplicate(prior));
        }

        self.journal
            .append(EventDraft::for_order(order, EventKind::ExecutionStarted))?;

        if !self.breaker.allow().is_admitted() {
            let reason = "circuit breaker open".to_string();
            warn!(order_id = %order.order_id, "execution rejected, circuit breaker open");
            self.fail(order, ExecutionFailureKind::BreakerOpen, reason, 0)
                .await
        } else {
            self.attempt_loop(order).await
        }
    }

    async fn attempt_loop(&self, order: &Order) -> JournalResult<ExecutionOutcome> {
        let max_attempts = self.config.max_attempts.max(1);
        let attempt_timeout = Duration::from_millis(self.config.attempt_timeout_ms);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let transient_reason =
                match timeout(attempt_timeout, self.executor.execute(order)).await {
                    Ok(Ok(fill)) => return self.complete(order, fill, attempt).await,
                    Ok(Err(ExecError::Permanent(msg))) => {
                        self.breaker.record_failure();
                        error!(
                            order_id = %order.order_id,
                            attempt,
                            reason = %msg,
                            "permanent execution failure"
                        );
                        return self
                            .fail(order, ExecutionFailureKind::Permanent, msg, attempt)
                            .await;
                    }
                    Ok(Err(ExecError::Transient(msg))) => msg,
                    Err(_) => format!(
                        "attempt timed out after {}ms",
                        self.config.attempt_timeout_ms
                    ),
                };

            warn!(
                order_id = %order.order_id,
                attempt,
                max_attempts,
                reason = %transient_reason,
                "transient execution failure"
            );

            if attempt >= max_attempts {
                self.breaker.record_failure();
                let reason = format!(
                    "{max_attempts} attempts exhausted; last error: {transient_reason}"
                );
                return self
                    .fail(order, ExecutionFailureKind::RetriesExhausted, reason, attempt)
                    .await;
            }

            let backoff =
                Duration::from_millis(self.config.backoff_base_ms << (attempt - 1));
            sleep(backoff).await;
        }
    }

    async fn complete(
        &self,
        order: &Order,
        fill: Fill,
        attempts: u32,
    ) -> JournalResult<ExecutionOutcome> {
        self.breaker.record_success();

        self.journal.append(EventDraft::for_order(
            order,
            EventKind::ExecutionCompleted {
                fill_price: fill.price,
                fill_quantity: fill.quantity,
                attempts,
            },
        ))?;

        let position =
            self.book
                .apply_fill(&order.symbol, order.side, fill.quantity, fill.price);

        self.journal.append(EventDraft::for_order(
            order,
            EventKind::PositionUpdated {
                symbol: position.symbol,
                quantity: position.quantity,
                average_price: position.average_price,
            },
        ))?;

        EXECUTIONS_TOTAL.with_label_values(&["executed"]).inc();
        EXECUTION_ATTEMPTS.observe(f64::from(attempts));

        info!(
            order_id = %order.order_id,
            fill_price = %fill.price,
            attempts,
            "order executed"
        );

        Ok(ExecutionOutcome::Executed(fill))
    }

    async fn fail(
        &self,
        order: &Order,
        kind: ExecutionFailureKind,
        reason: String,
        attempts: u32,
    ) -> JournalResult<ExecutionOutcome> {
        self.journal.append(EventDraft::for_order(
            order,
            EventKind::ExecutionFailed {
                kind,
                reason: reason.clone(),
                attempts,
            },
        ))?;

        let label = match kind {
            ExecutionFailureKind::BreakerOpen => "breaker_open",
            _ => "failed",
        };
        EXECUTIONS_TOTAL.with_label_values(&[label]).inc();

        Ok(ExecutionOutcome::Failed { kind, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    use ordergate_core::{
        ClientOrderId, CorrelationId, EventType, OrderRequest, OrderSide, Price, Qty, UserId,
    };
    use ordergate_journal::JournalConfig;

    use crate::breaker::BreakerConfig;

    /// Executor that replays a scripted sequence of outcomes.
    struct ScriptedExecutor {
        script: Mutex<VecDeque<Result<Fill, ExecError>>>,
        calls: AtomicU32,
    }

    impl ScriptedExecutor {
        fn new(script: Vec<Result<Fill, ExecError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn execute(&self, _order: &Order) -> Result<Fill, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ExecError::Transient("script exhausted".to_string())))
        }
    }

    /// Executor that never resolves; used to exercise the timeout.
    struct HangingExecutor;

    #[async_trait]
    impl Executor for HangingExecutor {
        async fn execute(&self, _order: &Order) -> Result<Fill, ExecError> {
            sleep(Duration::from_secs(3600)).await;
            Err(ExecError::Transient("unreachable".to_string()))
        }
    }

    fn fill() -> Fill {
        Fill::new(Price::new(dec!(150.50)), Qty::new(dec!(100)))
    }

    fn order(cloid: Option<&str>) -> Order {
        Order::from_request(
            OrderRequest {
                symbol: "AAPL".to_string(),
                side: OrderSide::Buy,
                quantity: Qty::new(dec!(100)),
                limit_price: Price::new(dec!(150.50)),
                strategy: "default".to_string(),
                client_order_id: cloid.map(ClientOrderId::new),
            },
            ordergate_core::OrderId::generate(),
            CorrelationId::generate(),
            UserId::new("trader-1"),
        )
    }

    fn pipeline(executor: Arc<dyn Executor>) -> (ExecutionPipeline, Arc<EventLog>, Arc<PositionBook>) {
        let journal = Arc::new(EventLog::new(JournalConfig::default()));
        let book = Arc::new(PositionBook::new());
        let pipeline = ExecutionPipeline::new(
            Arc::clone(&journal),
            Arc::clone(&book),
            Arc::new(CircuitBreaker::new(BreakerConfig::default())),
            Arc::new(IdempotencyIndex::new()),
            executor,
            PipelineConfig::default(),
        );
        (pipeline, journal, book)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_emits_completed_then_position_updated() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(fill())]));
        let (pipeline, journal, book) = pipeline(executor.clone());
        let order = order(None);

        let outcome = pipeline.process(&order).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Executed(_)));
        assert_eq!(executor.calls(), 1);

        let chain: Vec<EventType> = journal
            .by_order(&order.order_id)
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            chain,
            vec![
                EventType::ExecutionStarted,
                EventType::ExecutionCompleted,
                EventType::PositionUpdated,
            ]
        );

        let position = book.position("AAPL").unwrap();
        assert_eq!(position.quantity, dec!(100));
        assert_eq!(position.average_price, Price::new(dec!(150.50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retry_then_succeed() {
        let executor = Arc::new(ScriptedExecutor::new(vec![
            Err(ExecError::Transient("venue busy".to_string())),
            Err(ExecError::Transient("venue busy".to_string())),
            Ok(fill()),
        ]));
        let (pipeline, journal, _) = pipeline(executor.clone());
        let order = order(None);

        let outcome = pipeline.process(&order).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Executed(_)));
        assert_eq!(executor.calls(), 3);

        let completed = journal.by_type(EventType::ExecutionCompleted, None, None);
        assert!(matches!(
            completed[0].kind,
            EventKind::ExecutionCompleted { attempts: 3, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_with_final_reason() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let (pipeline, journal, book) = pipeline(executor.clone());
        let order = order(None);

        let outcome = pipeline.process(&order).await.unwrap();
        match outcome {
            ExecutionOutcome::Failed { kind, reason } => {
                assert_eq!(kind, ExecutionFailureKind::RetriesExhausted);
                assert!(reason.contains("3 attempts exhausted"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(executor.calls(), 3);
        assert!(book.position("AAPL").is_none());
        assert_eq!(pipeline.breaker().consecutive_failures(), 1);

        let failed = journal.by_type(EventType::ExecutionFailed, None, None);
        assert_eq!(failed.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_not_retried() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Err(ExecError::Permanent(
            "order rejected by venue".to_string(),
        ))]));
        let (pipeline, _, _) = pipeline(executor.clone());
        let order = order(None);

        let outcome = pipeline.process(&order).await.unwrap();
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed {
                kind: ExecutionFailureKind::Permanent,
                ..
            }
        ));
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_transient() {
        let executor = Arc::new(HangingExecutor);
        let (pipeline, _, _) = pipeline(executor);
        let order = order(None);

        let outcome = pipeline.process(&order).await.unwrap();
        match outcome {
            ExecutionOutcome::Failed { kind, reason } => {
                assert_eq!(kind, ExecutionFailureKind::RetriesExhausted);
                assert!(reason.contains("timed out"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_opens_after_threshold_and_blocks_without_executor_call() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let (pipeline, journal, _) = pipeline(executor.clone());

        // Five orders exhaust retries; the breaker opens on the fifth.
        for _ in 0..5 {
            let order = order(None);
            let outcome = pipeline.process(&order).await.unwrap();
            assert!(matches!(
                outcome,
                ExecutionOutcome::Failed {
                    kind: ExecutionFailureKind::RetriesExhausted,
                    ..
                }
            ));
        }
        assert_eq!(pipeline.breaker().state(), crate::BreakerState::Open);
        let calls_before = executor.calls();
        assert_eq!(calls_before, 15);

        // The sixth order is rejected before any executor call.
        let sixth = order(None);
        let outcome = pipeline.process(&sixth).await.unwrap();
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed {
                kind: ExecutionFailureKind::BreakerOpen,
                ..
            }
        ));
        assert_eq!(executor.calls(), calls_before);

        let chain: Vec<EventType> = journal
            .by_order(&sixth.order_id)
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            chain,
            vec![EventType::ExecutionStarted, EventType::ExecutionFailed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_claim_short_circuits_without_events() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(fill()), Ok(fill())]));
        let (pipeline, journal, _) = pipeline(executor.clone());

        let first = order(Some("k1"));
        pipeline.process(&first).await.unwrap();

        let second = order(Some("k1"));
        let outcome = pipeline.process(&second).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Duplicate(first.order_id));
        assert_eq!(executor.calls(), 1);
        assert!(journal.by_order(&second.order_id).is_empty());
    }
}
