//! Composition root.
//!
//! Wires the component graph explicitly — journal, position book, risk
//! engine, breaker, idempotency index, pipeline, coordinator — and
//! hands it to the HTTP gateway. Nothing in the system is a global;
//! tests inject their own executor at the seam.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use ordergate_coordinator::OrderCoordinator;
use ordergate_exec::{
    CircuitBreaker, ExecutionPipeline, Executor, IdempotencyIndex, SimulatedExecutor,
};
use ordergate_gateway::{router, AppState, AuthVerifier};
use ordergate_journal::{AuditExporter, EventLog};
use ordergate_position::PositionBook;
use ordergate_risk::RiskEngine;

use crate::config::AppConfig;
use crate::error::AppResult;

/// The assembled system.
pub struct Application {
    pub state: AppState,
    listen_addr: String,
}

impl Application {
    /// Build the graph with the default simulated executor.
    #[must_use]
    pub fn build(config: AppConfig) -> Self {
        let executor = Arc::new(SimulatedExecutor::new(config.simulator.clone()));
        Self::build_with_executor(config, executor)
    }

    /// Build the graph with an injected executor.
    #[must_use]
    pub fn build_with_executor(config: AppConfig, executor: Arc<dyn Executor>) -> Self {
        let journal = Arc::new(match &config.export {
            Some(export) => EventLog::with_exporter(
                config.journal.clone(),
                AuditExporter::new(export),
            ),
            None => EventLog::new(config.journal.clone()),
        });
        let book = Arc::new(PositionBook::new());
        let risk = Arc::new(RiskEngine::new(
            Arc::clone(&journal),
            Arc::clone(&book),
            config.risk.clone(),
        ));
        let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
        let pipeline = Arc::new(ExecutionPipeline::new(
            Arc::clone(&journal),
            Arc::clone(&book),
            Arc::clone(&breaker),
            Arc::new(IdempotencyIndex::new()),
            executor,
            config.pipeline.clone(),
        ));
        let coordinator = Arc::new(OrderCoordinator::new(
            Arc::clone(&journal),
            Arc::clone(&risk),
            pipeline,
            config.coordinator.clone(),
        ));
        let auth = Arc::new(AuthVerifier::new(&config.auth));

        let state = AppState {
            coordinator,
            risk,
            journal,
            book,
            breaker,
            auth,
        };

        Self {
            state,
            listen_addr: config.listen_addr,
        }
    }

    /// Serve the gateway until ctrl-c.
    pub async fn serve(self) -> AppResult<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(addr = %self.listen_addr, "gateway listening");

        let journal = Arc::clone(&self.state.journal);
        let app = router(self.state);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Drain any buffered audit lines before exit.
        if let Err(e) = journal.flush_exporter() {
            tracing::warn!(error = %e, "failed to flush audit export on shutdown");
        }
        info!("gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
}
