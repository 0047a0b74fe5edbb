//! Order lifecycle types.
//!
//! An order is created once and moves through a linear, monotone state
//! machine. After creation only `status`, `updated_at`, and
//! `filled_price` may change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Qty};
use crate::error::CoreError;
use crate::ids::{ClientOrderId, CorrelationId, OrderId};
use crate::principal::UserId;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns +1 for buy, -1 for sell (for signed position math).
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Buy => Decimal::ONE,
            Self::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order status state machine.
///
/// `Pending → RiskCheck → {Approved, Rejected}`;
/// `Approved → Executing → {Executed, Failed}`.
/// Transitions are linear and monotone; no backward transition is
/// legal, and each transition emits exactly one journal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    RiskCheck,
    Approved,
    Rejected,
    Executing,
    Executed,
    Failed,
}

impl OrderStatus {
    /// Returns true if the order can make no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Executed | Self::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::RiskCheck => "RISK_CHECK",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Executing => "EXECUTING",
            Self::Executed => "EXECUTED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// An incoming submission before identifiers are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Instrument symbol, case-sensitive.
    pub symbol: String,
    pub side: OrderSide,
    /// Must be strictly positive.
    pub quantity: Qty,
    /// Must be non-negative.
    pub limit_price: Price,
    /// Opaque strategy tag for attribution.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Optional idempotency key; absent disables dedup.
    #[serde(default)]
    pub client_order_id: Option<ClientOrderId>,
}

fn default_strategy() -> String {
    "default".to_string()
}

impl OrderRequest {
    /// Validate the submission shape.
    ///
    /// Validation failures are permanent: the submission is rejected
    /// synchronously and no order is created.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.symbol.is_empty() {
            return Err(CoreError::InvalidSymbol("symbol must not be empty".into()));
        }
        if !self.quantity.is_positive() {
            return Err(CoreError::InvalidQuantity(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.limit_price.is_negative() {
            return Err(CoreError::InvalidPrice(format!(
                "limit price must be non-negative, got {}",
                self.limit_price
            )));
        }
        Ok(())
    }

    /// Notional value of the submission: quantity * limit price.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.quantity.notional(self.limit_price)
    }
}

/// Core order entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub correlation_id: CorrelationId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Qty,
    pub limit_price: Price,
    pub user_id: UserId,
    pub strategy: String,
    pub status: OrderStatus,
    /// Price at which the order filled; set only on `Executed`.
    pub filled_price: Option<Price>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new `Pending` order from a validated request.
    #[must_use]
    pub fn from_request(
        request: OrderRequest,
        order_id: OrderId,
        correlation_id: CorrelationId,
        user_id: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            client_order_id: request.client_order_id,
            correlation_id,
            symbol: request.symbol,
            side: request.side,
            quantity: request.quantity,
            limit_price: request.limit_price,
            user_id,
            strategy: request.strategy,
            status: OrderStatus::Pending,
            filled_price: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Notional value: quantity * limit price.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.quantity.notional(self.limit_price)
    }

    /// Quantity signed by side: positive for buys, negative for sells.
    #[must_use]
    pub fn signed_quantity(&self) -> Decimal {
        self.side.sign() * self.quantity.inner()
    }
}

/// A completed downstream execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub price: Price,
    pub quantity: Qty,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    #[must_use]
    pub fn new(price: Price, quantity: Qty) -> Self {
        Self {
            price,
            quantity,
            timestamp: Utc::now(),
        }
    }
}
