//! Audit event model.
//!
//! Every state transition in the system is recorded as an immutable
//! `Event`. The payload is a sum type with one variant per event kind
//! carrying its specific fields, so consumers never dig through
//! untyped maps. Events are never mutated or deleted; append order
//! within a correlation chain is the canonical causal order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Qty};
use crate::ids::{CorrelationId, EventId, OrderId};
use crate::order::{Order, OrderSide};
use crate::principal::UserId;
use crate::risk::{RiskLimits, Violation};

/// Closed set of event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    OrderCreated,
    RiskCheckStarted,
    RiskCheckPassed,
    RiskCheckFailed,
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
    RiskConfigUpdated,
    KillSwitchToggled,
    PositionUpdated,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OrderCreated => "ORDER_CREATED",
            Self::RiskCheckStarted => "RISK_CHECK_STARTED",
            Self::RiskCheckPassed => "RISK_CHECK_PASSED",
            Self::RiskCheckFailed => "RISK_CHECK_FAILED",
            Self::ExecutionStarted => "EXECUTION_STARTED",
            Self::ExecutionCompleted => "EXECUTION_COMPLETED",
            Self::ExecutionFailed => "EXECUTION_FAILED",
            Self::RiskConfigUpdated => "RISK_CONFIG_UPDATED",
            Self::KillSwitchToggled => "KILL_SWITCH_TOGGLED",
            Self::PositionUpdated => "POSITION_UPDATED",
        };
        write!(f, "{s}")
    }
}

/// Why an execution attempt chain ended in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionFailureKind {
    /// Circuit breaker rejected the attempt before any downstream call.
    BreakerOpen,
    /// Downstream rejected the order for a business reason; not retried.
    Permanent,
    /// All retry attempts were exhausted on transient failures.
    RetriesExhausted,
}

impl fmt::Display for ExecutionFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BreakerOpen => "BREAKER_OPEN",
            Self::Permanent => "PERMANENT",
            Self::RetriesExhausted => "RETRIES_EXHAUSTED",
        };
        write!(f, "{s}")
    }
}

/// Typed event payload, one variant per event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    OrderCreated {
        symbol: String,
        side: OrderSide,
        quantity: Qty,
        limit_price: Price,
        strategy: String,
    },
    RiskCheckStarted,
    RiskCheckPassed {
        net_exposure: Decimal,
        gross_exposure: Decimal,
    },
    RiskCheckFailed {
        violations: Vec<Violation>,
    },
    ExecutionStarted,
    ExecutionCompleted {
        fill_price: Price,
        fill_quantity: Qty,
        attempts: u32,
    },
    ExecutionFailed {
        kind: ExecutionFailureKind,
        reason: String,
        attempts: u32,
    },
    RiskConfigUpdated {
        limits: RiskLimits,
    },
    KillSwitchToggled {
        enabled: bool,
    },
    PositionUpdated {
        symbol: String,
        quantity: Decimal,
        average_price: Price,
    },
}

impl EventKind {
    /// The event type this payload belongs to.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::OrderCreated { .. } => EventType::OrderCreated,
            Self::RiskCheckStarted => EventType::RiskCheckStarted,
            Self::RiskCheckPassed { .. } => EventType::RiskCheckPassed,
            Self::RiskCheckFailed { .. } => EventType::RiskCheckFailed,
            Self::ExecutionStarted => EventType::ExecutionStarted,
            Self::ExecutionCompleted { .. } => EventType::ExecutionCompleted,
            Self::ExecutionFailed { .. } => EventType::ExecutionFailed,
            Self::RiskConfigUpdated { .. } => EventType::RiskConfigUpdated,
            Self::KillSwitchToggled { .. } => EventType::KillSwitchToggled,
            Self::PositionUpdated { .. } => EventType::PositionUpdated,
        }
    }
}

/// Immutable journal record.
///
/// `timestamp` is assigned by the journal on append and is strictly
/// increasing across the whole log at microsecond precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub correlation_id: CorrelationId,
    /// Absent for events not tied to an order (config, kill switch).
    pub order_id: Option<OrderId>,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

/// An event before the journal assigns its id and timestamp.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub correlation_id: CorrelationId,
    pub order_id: Option<OrderId>,
    pub user_id: UserId,
    pub kind: EventKind,
}

impl EventDraft {
    /// Draft an event in an order's correlation chain.
    #[must_use]
    pub fn for_order(order: &Order, kind: EventKind) -> Self {
        Self {
            correlation_id: order.correlation_id,
            order_id: Some(order.order_id),
            user_id: order.user_id.clone(),
            kind,
        }
    }

    /// Draft an event for an operator action outside any order chain.
    ///
    /// A fresh correlation id is assigned so the action is still
    /// individually traceable.
    #[must_use]
    pub fn for_actor(actor: UserId, kind: EventKind) -> Self {
        Self {
            correlation_id: CorrelationId::generate(),
            order_id: None,
            user_id: actor,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_maps_to_type() {
        assert_eq!(
            EventKind::RiskCheckStarted.event_type(),
            EventType::RiskCheckStarted
        );
        assert_eq!(
            EventKind::KillSwitchToggled { enabled: true }.event_type(),
            EventType::KillSwitchToggled
        );
    }

    #[test]
    fn test_event_serializes_with_single_event_type_tag() {
        let event = Event {
            event_id: EventId::generate(),
            correlation_id: CorrelationId::generate(),
            order_id: Some(OrderId::generate()),
            timestamp: Utc::now(),
            user_id: UserId::new("trader-1"),
            kind: EventKind::ExecutionCompleted {
                fill_price: Price::new(dec!(150.50)),
                fill_quantity: Qty::new(dec!(100)),
                attempts: 1,
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "EXECUTION_COMPLETED");
        assert_eq!(json["fill_price"], "150.50");
        assert_eq!(json["attempts"], 1);
    }

    #[test]
    fn test_event_type_display_matches_wire_name() {
        assert_eq!(EventType::OrderCreated.to_string(), "ORDER_CREATED");
        assert_eq!(EventType::PositionUpdated.to_string(), "POSITION_UPDATED");
    }
}
