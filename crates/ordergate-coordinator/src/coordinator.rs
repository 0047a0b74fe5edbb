//! The order coordinator.
//!
//! # Submission path (synchronous)
//!
//! 1. Validate the request shape.
//! 2. Assign order and correlation ids; claim the idempotency
//!    fingerprint — duplicates surface here, before any event is
//!    written, so one `(user, client_order_id)` pair produces exactly
//!    one `ORDER_CREATED`.
//! 3. Register the order and emit `ORDER_CREATED`.
//! 4. Emit `RISK_CHECK_STARTED`, run the risk check, emit the
//!    passed/failed event, and return the response.
//! 5. Approved orders are handed to the execution pipeline on a
//!    semaphore-bounded worker pool; all execution events happen after
//!    the response is sent.
//!
//! The coordinator owns order status exclusively. Per order there is
//! one submission call and at most one execution task, so no order
//! ever has two outstanding transitions.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use ordergate_core::{
    CorrelationId, Event, EventDraft, EventKind, Order, OrderId, OrderRequest, OrderStatus,
    Principal, Violation,
};
use ordergate_exec::{Claim, ExecutionOutcome, ExecutionPipeline, Fingerprint};
use ordergate_journal::EventLog;
use ordergate_risk::RiskEngine;
use ordergate_telemetry::metrics::{
    DAILY_VOLUME_USD, JOURNAL_EVENTS, ORDERS_SUBMITTED_TOTAL, RISK_VIOLATIONS_TOTAL,
};

use crate::error::{SubmitError, SubmitResult};

/// Coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Maximum concurrently executing orders; further approvals queue
    /// on the worker pool.
    #[serde(default = "default_max_inflight")]
    pub max_inflight_executions: usize,
}

fn default_max_inflight() -> usize {
    64
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_inflight_executions: default_max_inflight(),
        }
    }
}

/// Synchronous response to a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub order_id: OrderId,
    pub correlation_id: CorrelationId,
    pub status: OrderStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub violations: Vec<Violation>,
    pub timestamp: chrono::DateTime<Utc>,
}

struct CoordinatorInner {
    journal: Arc<EventLog>,
    risk: Arc<RiskEngine>,
    pipeline: Arc<ExecutionPipeline>,
    orders: DashMap<OrderId, Order>,
    execution_permits: Arc<Semaphore>,
}

/// Drives orders through the state machine and owns their status.
pub struct OrderCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl OrderCoordinator {
    #[must_use]
    pub fn new(
        journal: Arc<EventLog>,
        risk: Arc<RiskEngine>,
        pipeline: Arc<ExecutionPipeline>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                journal,
                risk,
                pipeline,
                orders: DashMap::new(),
                execution_permits: Arc::new(Semaphore::new(
                    config.max_inflight_executions.max(1),
                )),
            }),
        }
    }

    /// Submit an order.
    ///
    /// Returns after the risk decision; execution continues
    /// asynchronously and is observable through the journal and
    /// `get`.
    pub async fn submit(
        &self,
        request: OrderRequest,
        principal: &Principal,
    ) -> SubmitResult<SubmitResponse> {
        let inner = &self.inner;

        if let Err(e) = request.validate() {
            ORDERS_SUBMITTED_TOTAL.with_label_values(&["invalid"]).inc();
            return Err(e.into());
        }

        let mut order = Order::from_request(
            request,
            OrderId::generate(),
            CorrelationId::generate(),
            principal.user_id.clone(),
        );

        // Claim before any event is written: a duplicate produces no
        // second ORDER_CREATED.
        if let Claim::Duplicate(prior_order_id) = inner
            .pipeline
            .idempotency()
            .claim(Fingerprint::of(&order), order.order_id)
        {
            warn!(
                user_id = %principal.user_id,
                %prior_order_id,
                "duplicate submission rejected"
            );
            ORDERS_SUBMITTED_TOTAL
                .with_label_values(&["duplicate"])
                .inc();
            return Err(SubmitError::Duplicate { prior_order_id });
        }

        inner.orders.insert(order.order_id, order.clone());
        inner.append(EventDraft::for_order(
            &order,
            EventKind::OrderCreated {
                symbol: order.symbol.clone(),
                side: order.side,
                quantity: order.quantity,
                limit_price: order.limit_price,
                strategy: order.strategy.clone(),
            },
        ))?;

        inner.transition(&mut order, OrderStatus::RiskCheck);
        inner.append(EventDraft::for_order(&order, EventKind::RiskCheckStarted))?;

        let decision = inner.risk.check(&order);

        if !decision.passed {
            for violation in &decision.violations {
                RISK_VIOLATIONS_TOTAL
                    .with_label_values(&[&violation.to_string()])
                    .inc();
            }
            inner.transition(&mut order, OrderStatus::Rejected);
            inner.append(EventDraft::for_order(
                &order,
                EventKind::RiskCheckFailed {
                    violations: decision.violations.clone(),
                },
            ))?;
            ORDERS_SUBMITTED_TOTAL
                .with_label_values(&["rejected"])
                .inc();
            info!(
                order_id = %order.order_id,
                violations = ?decision.violations,
                "order rejected by risk"
            );
            return Ok(SubmitResponse {
                order_id: order.order_id,
                correlation_id: order.correlation_id,
                status: OrderStatus::Rejected,
                message: decision.message(),
                violations: decision.violations,
                timestamp: Utc::now(),
            });
        }

        inner.append(EventDraft::for_order(
            &order,
            EventKind::RiskCheckPassed {
                net_exposure: decision.net_exposure,
                gross_exposure: decision.gross_exposure,
            },
        ))?;
        inner.transition(&mut order, OrderStatus::Approved);
        ORDERS_SUBMITTED_TOTAL
            .with_label_values(&["approved"])
            .inc();
        if let Some(volume) = inner.risk.daily_volume().to_f64() {
            DAILY_VOLUME_USD.set(volume);
        }

        info!(
            order_id = %order.order_id,
            correlation_id = %order.correlation_id,
            symbol = %order.symbol,
            "order approved, queued for execution"
        );

        let response = SubmitResponse {
            order_id: order.order_id,
            correlation_id: order.correlation_id,
            status: OrderStatus::Approved,
            message: "order approved and queued for execution".to_string(),
            violations: Vec::new(),
            timestamp: Utc::now(),
        };

        let task_inner = Arc::clone(inner);
        tokio::spawn(async move {
            let _permit = match Arc::clone(&task_inner.execution_permits)
                .acquire_owned()
                .await
            {
                Ok(permit) => permit,
                Err(_) => return, // pool closed during shutdown
            };
            task_inner.run_execution(order).await;
        });

        Ok(response)
    }

    /// Current view of an order.
    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<Order> {
        self.inner.orders.get(order_id).map(|o| o.clone())
    }

    /// All orders, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.inner.orders.iter().map(|o| o.clone()).collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }
}

impl CoordinatorInner {
    async fn run_execution(&self, mut order: Order) {
        self.transition(&mut order, OrderStatus::Executing);

        match self.pipeline.process(&order).await {
            Ok(ExecutionOutcome::Executed(fill)) => {
                self.transition(&mut order, OrderStatus::Executed);
                if let Some(mut entry) = self.orders.get_mut(&order.order_id) {
                    entry.filled_price = Some(fill.price);
                }
            }
            Ok(ExecutionOutcome::Failed { kind, reason }) => {
                warn!(
                    order_id = %order.order_id,
                    kind = %kind,
                    reason = %reason,
                    "order execution failed"
                );
                self.transition(&mut order, OrderStatus::Failed);
            }
            Ok(ExecutionOutcome::Duplicate(prior)) => {
                // The coordinator claimed this fingerprint for this
                // very order; a duplicate here means the index was
                // corrupted.
                error!(
                    order_id = %order.order_id,
                    %prior,
                    "fingerprint unexpectedly owned by another order"
                );
                self.transition(&mut order, OrderStatus::Failed);
            }
            Err(e) => {
                // Journal failure: the order's state is undefined and
                // needs operator intervention. Status stays EXECUTING.
                error!(
                    order_id = %order.order_id,
                    error = %e,
                    "journal append failed during execution"
                );
            }
        }
    }

    fn transition(&self, order: &mut Order, status: OrderStatus) {
        order.status = status;
        order.updated_at = Utc::now();
        if let Some(mut entry) = self.orders.get_mut(&order.order_id) {
            entry.status = status;
            entry.updated_at = order.updated_at;
        }
    }

    fn append(&self, draft: EventDraft) -> SubmitResult<Arc<Event>> {
        let event = self.journal.append(draft)?;
        JOURNAL_EVENTS.set(self.journal.len() as f64);
        Ok(event)
    }
}
