//! Symbol-level position tracking.
//!
//! Locking: each fill mutates a single symbol's row under that row's
//! exclusive entry lock, taken while holding the snapshot gate in read
//! mode. `snapshot()` takes the gate in write mode, which excludes all
//! concurrent fills and yields a consistent point-in-time copy across
//! every symbol.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ordergate_core::{OrderSide, Price, Qty};

/// An open (or flat) position in one symbol.
///
/// `quantity` is signed: long positive, short negative. A quantity of
/// zero keeps the row alive so the next fill of either side opens
/// cleanly at its own price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed quantity: long positive, short negative.
    pub quantity: Decimal,
    /// Weighted average entry price on the current side.
    pub average_price: Price,
    /// Price of the most recent fill; the reference price for
    /// exposure valuation.
    pub last_price: Price,
    pub last_update: DateTime<Utc>,
}

impl Position {
    /// Signed notional at the reference price.
    #[must_use]
    pub fn signed_notional(&self) -> Decimal {
        self.quantity * self.last_price.inner()
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// The position book: one row per symbol ever touched by a fill.
#[derive(Default)]
pub struct PositionBook {
    /// Read side held by mutators, write side by `snapshot()`.
    snapshot_gate: RwLock<()>,
    positions: DashMap<String, Position>,
}

impl PositionBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an executed fill to the symbol's position.
    ///
    /// Semantics:
    /// - no existing row: open at the fill price, signed by side;
    /// - same-direction add: average price re-weighted by absolute
    ///   quantities, quantity adjusted;
    /// - opposite-direction reduction: quantity shrinks toward zero,
    ///   average price unchanged;
    /// - reduction through zero: the residual opens a fresh position
    ///   on the opposite side at the fill price;
    /// - reduction to exactly zero: the row stays with quantity zero
    ///   and average price set to the fill price.
    ///
    /// Returns the updated position.
    pub fn apply_fill(&self, symbol: &str, side: OrderSide, quantity: Qty, price: Price) -> Position {
        let _gate = self.snapshot_gate.read();
        let now = Utc::now();
        let delta = side.sign() * quantity.inner();

        let mut entry = self
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position {
                symbol: symbol.to_string(),
                quantity: Decimal::ZERO,
                average_price: price,
                last_price: price,
                last_update: now,
            });
        let position = entry.value_mut();

        let old_qty = position.quantity;
        let new_qty = old_qty + delta;

        if old_qty.is_zero() {
            // Fresh open (first fill, or re-open of a flat row).
            position.average_price = price;
        } else if old_qty.is_sign_positive() == delta.is_sign_positive() {
            // Same-direction add: weight by absolute quantities.
            let total_abs = old_qty.abs() + quantity.inner();
            position.average_price = Price::new(
                (old_qty.abs() * position.average_price.inner()
                    + quantity.inner() * price.inner())
                    / total_abs,
            );
        } else if new_qty.is_zero() {
            // Closed out exactly: keep the row, reset the basis.
            position.average_price = price;
        } else if old_qty.is_sign_positive() != new_qty.is_sign_positive() {
            // Crossed through zero: residual opens the opposite side.
            position.average_price = price;
        }
        // Plain reduction leaves average_price untouched.

        position.quantity = new_qty;
        position.last_price = price;
        position.last_update = now;

        debug!(
            symbol = %position.symbol,
            quantity = %position.quantity,
            average_price = %position.average_price,
            "position updated"
        );

        position.clone()
    }

    /// Current position for a symbol, if any fill ever touched it.
    #[must_use]
    pub fn position(&self, symbol: &str) -> Option<Position> {
        let _gate = self.snapshot_gate.read();
        self.positions.get(symbol).map(|p| p.clone())
    }

    /// Consistent point-in-time copy of every position.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Position> {
        let _gate = self.snapshot_gate.write();
        self.positions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of symbols with a row (flat rows included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
