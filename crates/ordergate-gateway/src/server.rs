//! Router and request handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use ordergate_coordinator::{OrderCoordinator, SubmitResponse};
use ordergate_core::{
    CorrelationId, Event, OrderId, OrderRequest, Principal, RiskLimits, Role,
};
use ordergate_exec::CircuitBreaker;
use ordergate_journal::EventLog;
use ordergate_position::PositionBook;
use ordergate_risk::RiskEngine;

use crate::auth::AuthVerifier;
use crate::error::{ApiError, ApiResult};

/// Shared component graph handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<OrderCoordinator>,
    pub risk: Arc<RiskEngine>,
    pub journal: Arc<EventLog>,
    pub book: Arc<PositionBook>,
    pub breaker: Arc<CircuitBreaker>,
    pub auth: Arc<AuthVerifier>,
}

impl AppState {
    /// Authenticate the caller and check the minimum role.
    fn authorize(&self, headers: &HeaderMap, required: Role) -> ApiResult<Principal> {
        let principal = self.auth.verify_bearer(headers)?;
        if !principal.role.permits(required) {
            return Err(ApiError::Forbidden(format!(
                "requires {required} role, caller has {}",
                principal.role
            )));
        }
        Ok(principal)
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/orders", post(submit_order).get(list_orders))
        .route("/api/v1/orders/:order_id", get(get_order))
        .route("/api/v1/risk/metrics", get(risk_metrics))
        .route("/api/v1/risk/limits", put(update_limits).get(get_limits))
        .route("/api/v1/risk/kill-switch", post(toggle_kill_switch))
        .route("/api/v1/positions", get(positions))
        .route("/api/v1/audit/events", get(audit_events))
        .route(
            "/api/v1/audit/correlation/:correlation_id",
            get(audit_by_correlation),
        )
        .route("/api/v1/audit/order/:order_id", get(audit_by_order))
        .route("/api/v1/system/metrics", get(system_metrics))
        .route("/api/v1/health", get(health))
        .route("/metrics", get(metrics_exposition))
        .with_state(state)
}

async fn submit_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<OrderRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let principal = state.authorize(&headers, Role::Trader)?;
    let response = state.coordinator.submit(request, &principal).await?;
    Ok(Json(response))
}

async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> ApiResult<Json<ordergate_core::Order>> {
    state.authorize(&headers, Role::Trader)?;
    let order_id: OrderId = order_id
        .parse()
        .map_err(|_| ApiError::Validation("malformed order id".to_string()))?;

    state
        .coordinator
        .get(&order_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("order {order_id}")))
}

async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    state.authorize(&headers, Role::Trader)?;
    let orders = state.coordinator.list();
    Ok(Json(json!({
        "total": orders.len(),
        "orders": orders,
    })))
}

async fn risk_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ordergate_core::RiskMetrics>> {
    state.authorize(&headers, Role::Trader)?;
    Ok(Json(state.risk.metrics()))
}

async fn get_limits(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<RiskLimits>> {
    state.authorize(&headers, Role::RiskManager)?;
    Ok(Json(state.risk.limits()))
}

async fn update_limits(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(limits): Json<RiskLimits>,
) -> ApiResult<Json<RiskLimits>> {
    let principal = state.authorize(&headers, Role::RiskManager)?;
    state
        .risk
        .update_limits(limits.clone(), &principal.user_id)?;
    info!(actor = %principal.user_id, "risk limits updated via API");
    Ok(Json(limits))
}

#[derive(Debug, Deserialize)]
struct KillSwitchRequest {
    enabled: bool,
}

async fn toggle_kill_switch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<KillSwitchRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let principal = state.authorize(&headers, Role::RiskManager)?;
    state.risk.set_kill_switch(body.enabled, &principal.user_id)?;
    Ok(Json(json!({
        "kill_switch_enabled": body.enabled,
        "timestamp": Utc::now(),
    })))
}

async fn positions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    state.authorize(&headers, Role::Trader)?;
    let snapshot = state.book.snapshot();
    let mut positions: Vec<_> = snapshot.into_values().collect();
    positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(Json(json!({
        "total_positions": positions.len(),
        "positions": positions,
    })))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    limit: usize,
}

fn default_audit_limit() -> usize {
    100
}

async fn audit_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.authorize(&headers, Role::Compliance)?;
    let events = owned(state.journal.recent(query.limit));
    Ok(Json(json!({
        "total": events.len(),
        "events": events,
    })))
}

async fn audit_by_correlation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(correlation_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.authorize(&headers, Role::Compliance)?;
    let correlation_id: CorrelationId = correlation_id
        .parse()
        .map_err(|_| ApiError::Validation("malformed correlation id".to_string()))?;

    let events = owned(state.journal.by_correlation(&correlation_id));
    if events.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no events for correlation {correlation_id}"
        )));
    }
    Ok(Json(json!({
        "correlation_id": correlation_id,
        "total_events": events.len(),
        "events": events,
    })))
}

async fn audit_by_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.authorize(&headers, Role::Compliance)?;
    let order_id: OrderId = order_id
        .parse()
        .map_err(|_| ApiError::Validation("malformed order id".to_string()))?;

    let events = owned(state.journal.by_order(&order_id));
    if events.is_empty() {
        return Err(ApiError::NotFound(format!("no events for order {order_id}")));
    }
    Ok(Json(json!({
        "order_id": order_id,
        "total_events": events.len(),
        "events": events,
    })))
}

async fn system_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    state.authorize(&headers, Role::Trader)?;
    Ok(Json(json!({
        "total_orders": state.coordinator.list().len(),
        "total_events": state.journal.len(),
        "circuit_breaker": {
            "state": state.breaker.state(),
            "consecutive_failures": state.breaker.consecutive_failures(),
        },
        "risk_metrics": state.risk.metrics(),
        "timestamp": Utc::now(),
    })))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "components": {
            "journal": { "events": state.journal.len() },
            "circuit_breaker": state.breaker.state(),
        },
    }))
}

async fn metrics_exposition() -> impl IntoResponse {
    match ordergate_telemetry::gather_metrics() {
        Ok(text) => text.into_response(),
        Err(e) => ApiError::Internal(e.to_string()).into_response(),
    }
}

fn owned(events: Vec<Arc<Event>>) -> Vec<Event> {
    events.into_iter().map(|e| (*e).clone()).collect()
}
