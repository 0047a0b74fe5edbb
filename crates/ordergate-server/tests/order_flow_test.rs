//! End-to-end order flow scenarios against the composed system.
//!
//! Builds the full component graph through the composition root with a
//! scripted executor injected at the seam, then drives submissions the
//! way the gateway would.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::time::{sleep, Duration};

use ordergate_coordinator::SubmitError;
use ordergate_core::{
    ClientOrderId, EventKind, EventType, ExecutionFailureKind, Fill, Order, OrderId,
    OrderRequest, OrderSide, OrderStatus, Price, Principal, Qty, RiskLimits, Role, UserId,
    Violation,
};
use ordergate_exec::{ExecError, Executor};
use ordergate_server::{AppConfig, Application};

// ============================================================================
// Test executor
// ============================================================================

enum ExecutorMode {
    /// Fill every order at its limit price.
    FillAtLimit,
    /// Fail every attempt transiently.
    AlwaysTransient,
}

struct TestExecutor {
    mode: ExecutorMode,
    calls: AtomicU32,
}

impl TestExecutor {
    fn new(mode: ExecutorMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for TestExecutor {
    async fn execute(&self, order: &Order) -> Result<Fill, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            ExecutorMode::FillAtLimit => Ok(Fill::new(order.limit_price, order.quantity)),
            ExecutorMode::AlwaysTransient => {
                Err(ExecError::Transient("venue unavailable".to_string()))
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn trader() -> Principal {
    Principal::new("trader-1", Role::Trader)
}

fn buy(symbol: &str, quantity: Decimal, price: Decimal) -> OrderRequest {
    OrderRequest {
        symbol: symbol.to_string(),
        side: OrderSide::Buy,
        quantity: Qty::new(quantity),
        limit_price: Price::new(price),
        strategy: "default".to_string(),
        client_order_id: None,
    }
}

fn with_cloid(mut request: OrderRequest, cloid: &str) -> OrderRequest {
    request.client_order_id = Some(ClientOrderId::new(cloid));
    request
}

async fn wait_terminal(app: &Application, order_id: OrderId) -> Order {
    loop {
        if let Some(order) = app.state.coordinator.get(&order_id) {
            if order.status.is_terminal() {
                return order;
            }
        }
        sleep(Duration::from_millis(10)).await;
    }
}

fn event_chain(app: &Application, order_id: &OrderId) -> Vec<EventType> {
    app.state
        .journal
        .by_order(order_id)
        .iter()
        .map(|e| e.event_type())
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn happy_path_buy() {
    let app = Application::build_with_executor(
        AppConfig::default(),
        TestExecutor::new(ExecutorMode::FillAtLimit),
    );

    let response = app
        .state
        .coordinator
        .submit(buy("AAPL", dec!(100), dec!(150.50)), &trader())
        .await
        .unwrap();
    assert_eq!(response.status, OrderStatus::Approved);

    let order = wait_terminal(&app, response.order_id).await;
    assert_eq!(order.status, OrderStatus::Executed);

    assert_eq!(
        event_chain(&app, &response.order_id),
        vec![
            EventType::OrderCreated,
            EventType::RiskCheckStarted,
            EventType::RiskCheckPassed,
            EventType::ExecutionStarted,
            EventType::ExecutionCompleted,
            EventType::PositionUpdated,
        ]
    );

    let position = app.state.book.position("AAPL").unwrap();
    assert_eq!(position.quantity, dec!(100));
    assert_eq!(position.average_price, Price::new(dec!(150.50)));

    assert_eq!(app.state.risk.daily_volume(), dec!(15050));
}

#[tokio::test(start_paused = true)]
async fn position_limit_rejection() {
    let app = Application::build_with_executor(
        AppConfig::default(),
        TestExecutor::new(ExecutorMode::FillAtLimit),
    );

    // Notional 20_000_000 against the default 1_000_000 limit.
    let response = app
        .state
        .coordinator
        .submit(buy("TSLA", dec!(100000), dec!(200)), &trader())
        .await
        .unwrap();

    assert_eq!(response.status, OrderStatus::Rejected);
    assert_eq!(response.violations, vec![Violation::PositionLimit]);

    let chain = event_chain(&app, &response.order_id);
    assert!(!chain.contains(&EventType::ExecutionStarted));
    assert!(!chain.contains(&EventType::ExecutionFailed));
    assert_eq!(app.state.risk.daily_volume(), dec!(0));
}

#[tokio::test(start_paused = true)]
async fn kill_switch_gate() {
    let app = Application::build_with_executor(
        AppConfig::default(),
        TestExecutor::new(ExecutorMode::FillAtLimit),
    );
    app.state
        .risk
        .set_kill_switch(true, &UserId::new("risk-manager-1"))
        .unwrap();

    let app_limits = app.state.risk.limits();
    assert!(app_limits.kill_switch_enabled);

    let response = app
        .state
        .coordinator
        .submit(buy("AAPL", dec!(100), dec!(150.50)), &trader())
        .await
        .unwrap();

    assert_eq!(response.status, OrderStatus::Rejected);
    // Kill switch short-circuits: no other violation is reported.
    assert_eq!(response.violations, vec![Violation::KillSwitchActive]);
}

#[tokio::test(start_paused = true)]
async fn idempotent_duplicate() {
    let app = Application::build_with_executor(
        AppConfig::default(),
        TestExecutor::new(ExecutorMode::FillAtLimit),
    );

    let first = app
        .state
        .coordinator
        .submit(with_cloid(buy("AAPL", dec!(100), dec!(150)), "k1"), &trader())
        .await
        .unwrap();
    assert_eq!(first.status, OrderStatus::Approved);

    let second = app
        .state
        .coordinator
        .submit(with_cloid(buy("AAPL", dec!(100), dec!(150)), "k1"), &trader())
        .await;

    match second {
        Err(SubmitError::Duplicate { prior_order_id }) => {
            assert_eq!(prior_order_id, first.order_id);
        }
        other => panic!("expected duplicate, got {other:?}"),
    }

    let created = app.state.journal.by_type(EventType::OrderCreated, None, None);
    assert_eq!(created.len(), 1);

    // The original still runs to a clean terminal state.
    let order = wait_terminal(&app, first.order_id).await;
    assert_eq!(order.status, OrderStatus::Executed);
}

#[tokio::test(start_paused = true)]
async fn circuit_breaker_trip() {
    let executor = TestExecutor::new(ExecutorMode::AlwaysTransient);
    let app = Application::build_with_executor(AppConfig::default(), executor.clone());

    // Five orders each exhaust three attempts; the breaker opens on
    // the fifth order's final failure.
    for _ in 0..5 {
        let response = app
            .state
            .coordinator
            .submit(buy("AAPL", dec!(10), dec!(100)), &trader())
            .await
            .unwrap();
        let order = wait_terminal(&app, response.order_id).await;
        assert_eq!(order.status, OrderStatus::Failed);

        let failed = app.state.journal.by_order(&response.order_id);
        let last = failed.last().unwrap();
        assert!(matches!(
            last.kind,
            EventKind::ExecutionFailed {
                kind: ExecutionFailureKind::RetriesExhausted,
                attempts: 3,
                ..
            }
        ));
    }
    assert_eq!(executor.calls(), 15);

    // The sixth order fails BREAKER_OPEN without an executor call.
    let response = app
        .state
        .coordinator
        .submit(buy("AAPL", dec!(10), dec!(100)), &trader())
        .await
        .unwrap();
    let order = wait_terminal(&app, response.order_id).await;
    assert_eq!(order.status, OrderStatus::Failed);
    assert_eq!(executor.calls(), 15);

    let events = app.state.journal.by_order(&response.order_id);
    let last = events.last().unwrap();
    assert!(matches!(
        last.kind,
        EventKind::ExecutionFailed {
            kind: ExecutionFailureKind::BreakerOpen,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn exposure_projection_rejects() {
    let app = Application::build_with_executor(
        AppConfig::default(),
        TestExecutor::new(ExecutorMode::FillAtLimit),
    );

    // Establish AAPL +5000 @ 100 (notional 500_000).
    let seed = app
        .state
        .coordinator
        .submit(buy("AAPL", dec!(5000), dec!(100)), &trader())
        .await
        .unwrap();
    let seeded = wait_terminal(&app, seed.order_id).await;
    assert_eq!(seeded.status, OrderStatus::Executed);

    // Tighten the net exposure limit to 600_000.
    let limits = RiskLimits {
        max_net_exposure: dec!(600000),
        ..Default::default()
    };
    app.state
        .risk
        .update_limits(limits, &UserId::new("risk-manager-1"))
        .unwrap();

    // BUY 2000 @ 100 projects 700_000 of net exposure.
    let response = app
        .state
        .coordinator
        .submit(buy("AAPL", dec!(2000), dec!(100)), &trader())
        .await
        .unwrap();

    assert_eq!(response.status, OrderStatus::Rejected);
    assert_eq!(response.violations, vec![Violation::NetExposureLimit]);
}

// ============================================================================
// Replay invariant
// ============================================================================

/// Replaying a correlation chain reproduces the order's final status
/// and its position contribution.
#[tokio::test(start_paused = true)]
async fn replay_reconstructs_final_state() {
    let app = Application::build_with_executor(
        AppConfig::default(),
        TestExecutor::new(ExecutorMode::FillAtLimit),
    );

    let response = app
        .state
        .coordinator
        .submit(buy("AAPL", dec!(100), dec!(150.50)), &trader())
        .await
        .unwrap();
    let order = wait_terminal(&app, response.order_id).await;

    let mut replayed_status = None;
    let mut replayed_quantity = Decimal::ZERO;
    for event in app.state.journal.by_correlation(&response.correlation_id) {
        replayed_status = Some(match &event.kind {
            EventKind::OrderCreated { .. } => OrderStatus::Pending,
            EventKind::RiskCheckStarted => OrderStatus::RiskCheck,
            EventKind::RiskCheckPassed { .. } => OrderStatus::Approved,
            EventKind::RiskCheckFailed { .. } => OrderStatus::Rejected,
            EventKind::ExecutionStarted => OrderStatus::Executing,
            EventKind::ExecutionCompleted { .. } => OrderStatus::Executed,
            EventKind::ExecutionFailed { .. } => OrderStatus::Failed,
            _ => continue,
        });
        if let EventKind::PositionUpdated { quantity, .. } = &event.kind {
            replayed_quantity = *quantity;
        }
    }

    assert_eq!(replayed_status, Some(order.status));
    assert_eq!(
        replayed_quantity,
        app.state.book.position("AAPL").unwrap().quantity
    );
}

/// Repeated buys accumulate quantity at a constant average price.
#[tokio::test(start_paused = true)]
async fn repeated_buys_accumulate() {
    let app = Application::build_with_executor(
        AppConfig::default(),
        TestExecutor::new(ExecutorMode::FillAtLimit),
    );

    for _ in 0..3 {
        let response = app
            .state
            .coordinator
            .submit(buy("AAPL", dec!(100), dec!(150)), &trader())
            .await
            .unwrap();
        let order = wait_terminal(&app, response.order_id).await;
        assert_eq!(order.status, OrderStatus::Executed);
    }

    let position = app.state.book.position("AAPL").unwrap();
    assert_eq!(position.quantity, dec!(300));
    assert_eq!(position.average_price, Price::new(dec!(150)));
}
