//! The pre-trade risk engine.
//!
//! # Check order (fixed)
//!
//! 1. Kill switch — short-circuits with `KILL_SWITCH_ACTIVE` alone.
//! 2. Position limit — projected per-symbol notional at the limit price.
//! 3. Daily volume — accepted-order notionals accumulated per UTC day.
//! 4. Net exposure — over positions projected with this order applied.
//! 5. Gross exposure — same projection, absolute notionals.
//!
//! All violations after the kill switch are accumulated; the caller
//! sees every breached limit, not just the first.
//!
//! The daily-volume check and the reservation of a passing order's
//! notional happen inside one critical section, so two concurrent
//! checks cannot both pass against the same pre-increment counter.
//! Exposure checks intentionally run against a snapshot: concurrent
//! submissions may race those limits, and serialization there is the
//! coordinator's concern, not this engine's.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ordergate_core::{
    Event, EventDraft, EventKind, Order, RiskLimits, RiskMetrics, UserId, Violation,
};
use ordergate_journal::EventLog;
use ordergate_position::PositionBook;

use crate::error::{RiskError, RiskResult};

/// Outcome of a pre-trade check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub passed: bool,
    pub violations: Vec<Violation>,
    /// Net exposure of the projected book (order applied).
    pub net_exposure: Decimal,
    /// Gross exposure of the projected book (order applied).
    pub gross_exposure: Decimal,
}

impl RiskDecision {
    /// Human-readable summary for responses and logs.
    #[must_use]
    pub fn message(&self) -> String {
        if self.passed {
            "risk check passed".to_string()
        } else {
            let list: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
            format!("risk violations: {}", list.join(", "))
        }
    }
}

struct RiskState {
    limits: RiskLimits,
    daily_volume: Decimal,
    volume_date: NaiveDate,
}

impl RiskState {
    /// Reset the counter when the UTC date has rolled over.
    fn roll_volume(&mut self, today: NaiveDate) {
        if today != self.volume_date {
            info!(
                previous_date = %self.volume_date,
                carried_volume = %self.daily_volume,
                "daily volume counter reset"
            );
            self.daily_volume = Decimal::ZERO;
            self.volume_date = today;
        }
    }
}

/// Pre-trade risk engine. Owns the limit configuration, the kill
/// switch, and the daily volume counter under a single mutex.
pub struct RiskEngine {
    journal: Arc<EventLog>,
    book: Arc<PositionBook>,
    state: Mutex<RiskState>,
}

impl RiskEngine {
    #[must_use]
    pub fn new(journal: Arc<EventLog>, book: Arc<PositionBook>, limits: RiskLimits) -> Self {
        Self {
            journal,
            book,
            state: Mutex::new(RiskState {
                limits,
                daily_volume: Decimal::ZERO,
                volume_date: Utc::now().date_naive(),
            }),
        }
    }

    /// Evaluate an order against every limit.
    ///
    /// On a pass, the order's notional is reserved into the daily
    /// volume counter before the lock is released.
    #[must_use]
    pub fn check(&self, order: &Order) -> RiskDecision {
        // Consistent book snapshot, taken outside the state lock.
        let snapshot = self.book.snapshot();
        let notional = order.notional();

        let mut state = self.state.lock();
        state.roll_volume(Utc::now().date_naive());

        if state.limits.kill_switch_enabled {
            warn!(order_id = %order.order_id, "kill switch active, order rejected");
            return RiskDecision {
                passed: false,
                violations: vec![Violation::KillSwitchActive],
                net_exposure: Decimal::ZERO,
                gross_exposure: Decimal::ZERO,
            };
        }

        let mut violations = Vec::new();

        // Projected per-symbol position, valued at the order's limit
        // price (the hypothetical fill price).
        let existing_qty = snapshot
            .get(&order.symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO);
        let projected_qty = existing_qty + order.signed_quantity();
        let projected_symbol_notional = projected_qty * order.limit_price.inner();
        if projected_symbol_notional.abs() > state.limits.max_position_size {
            violations.push(Violation::PositionLimit);
        }

        if state.daily_volume + notional > state.limits.max_daily_volume {
            violations.push(Violation::DailyVolumeLimit);
        }

        // Projected book: every other symbol at its reference price,
        // this symbol at the limit price.
        let mut net_exposure = projected_symbol_notional;
        let mut gross_exposure = projected_symbol_notional.abs();
        for (symbol, position) in &snapshot {
            if symbol == &order.symbol {
                continue;
            }
            let signed = position.signed_notional();
            net_exposure += signed;
            gross_exposure += signed.abs();
        }

        if net_exposure.abs() > state.limits.max_net_exposure {
            violations.push(Violation::NetExposureLimit);
        }
        if gross_exposure > state.limits.max_gross_exposure {
            violations.push(Violation::GrossExposureLimit);
        }

        let passed = violations.is_empty();
        if passed {
            // Reserved here, inside the same critical section as the
            // volume check.
            state.daily_volume += notional;
        }

        debug!(
            order_id = %order.order_id,
            passed,
            violations = ?violations,
            net_exposure = %net_exposure,
            gross_exposure = %gross_exposure,
            "risk check evaluated"
        );

        RiskDecision {
            passed,
            violations,
            net_exposure,
            gross_exposure,
        }
    }

    /// Replace the limit configuration.
    ///
    /// Validates every limit as non-negative, requires a non-empty
    /// actor for attribution, and appends `RISK_CONFIG_UPDATED`.
    pub fn update_limits(
        &self,
        limits: RiskLimits,
        actor: &UserId,
    ) -> RiskResult<Arc<Event>> {
        if actor.is_empty() {
            return Err(RiskError::EmptyActor);
        }
        limits.validate()?;

        {
            let mut state = self.state.lock();
            state.limits = limits.clone();
        }

        info!(actor = %actor, "risk limits updated");
        let event = self.journal.append(EventDraft::for_actor(
            actor.clone(),
            EventKind::RiskConfigUpdated { limits },
        ))?;
        Ok(event)
    }

    /// Set the kill switch. Idempotent on state, but every call appends
    /// its own `KILL_SWITCH_TOGGLED` event for the audit trail.
    pub fn set_kill_switch(&self, enabled: bool, actor: &UserId) -> RiskResult<Arc<Event>> {
        if actor.is_empty() {
            return Err(RiskError::EmptyActor);
        }

        {
            let mut state = self.state.lock();
            state.limits.kill_switch_enabled = enabled;
        }

        warn!(actor = %actor, enabled, "kill switch toggled");
        let event = self.journal.append(EventDraft::for_actor(
            actor.clone(),
            EventKind::KillSwitchToggled { enabled },
        ))?;
        Ok(event)
    }

    /// Copy of the current limit configuration.
    #[must_use]
    pub fn limits(&self) -> RiskLimits {
        self.state.lock().limits.clone()
    }

    /// Current risk metrics over the live (not projected) book.
    #[must_use]
    pub fn metrics(&self) -> RiskMetrics {
        let snapshot = self.book.snapshot();

        let mut net_exposure = Decimal::ZERO;
        let mut gross_exposure = Decimal::ZERO;
        let mut largest_position = Decimal::ZERO;
        for position in snapshot.values() {
            let signed = position.signed_notional();
            net_exposure += signed;
            gross_exposure += signed.abs();
            largest_position = largest_position.max(signed.abs());
        }

        let mut state = self.state.lock();
        state.roll_volume(Utc::now().date_naive());

        RiskMetrics {
            net_exposure,
            gross_exposure,
            daily_volume: state.daily_volume,
            total_positions: snapshot.len(),
            largest_position,
            kill_switch_active: state.limits.kill_switch_enabled,
        }
    }

    /// Current daily volume counter.
    #[must_use]
    pub fn daily_volume(&self) -> Decimal {
        self.state.lock().daily_volume
    }

    /// Backdate the volume counter's date, as if the last accumulation
    /// happened on `date`. Test hook for rollover behavior.
    #[cfg(test)]
    fn force_volume_date(&self, date: NaiveDate) {
        self.state.lock().volume_date = date;
    }
}
