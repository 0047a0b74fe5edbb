//! Core domain types for the ordergate trading control core.
//!
//! This crate provides the fundamental types shared by every other
//! component:
//! - `OrderId`, `CorrelationId`, `EventId`, `ClientOrderId`: identifiers
//! - `Price`, `Qty`: precision-safe numeric types
//! - `Order`, `OrderSide`, `OrderStatus`, `Fill`: order lifecycle
//! - `Event`, `EventKind`, `EventType`: the audit event model
//! - `RiskLimits`, `Violation`, `RiskMetrics`: risk configuration
//! - `Principal`, `Role`: authenticated identity

pub mod decimal;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod principal;
pub mod risk;

pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use event::{Event, EventDraft, EventKind, EventType, ExecutionFailureKind};
pub use ids::{ClientOrderId, CorrelationId, EventId, OrderId};
pub use order::{Fill, Order, OrderRequest, OrderSide, OrderStatus};
pub use principal::{Principal, Role, UserId};
pub use risk::{RiskLimits, RiskMetrics, Violation};
