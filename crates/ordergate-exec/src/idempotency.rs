//! Duplicate-submission detection.
//!
//! A submission's fingerprint is a SHA-256 digest over its identifying
//! fields. Submissions without a `client_order_id` mix in the order's
//! own id, which makes every fingerprint unique and disables dedup for
//! them. Fingerprints are retained for the process lifetime.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use ordergate_core::{Order, OrderId};

/// Stable digest of a submission's identifying fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of an order.
    ///
    /// Stable across process invocations for identical input: the
    /// digest covers `(user_id, symbol, side, quantity, limit_price,
    /// client_order_id)`. Without a client order id the order id
    /// stands in, so re-claiming by the same order stays idempotent
    /// while distinct submissions never collide.
    #[must_use]
    pub fn of(order: &Order) -> Self {
        let dedup_key = order
            .client_order_id
            .as_ref()
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| format!("nonce:{}", order.order_id));

        let mut hasher = Sha256::new();
        hasher.update(order.user_id.as_str());
        hasher.update(b":");
        hasher.update(&order.symbol);
        hasher.update(b":");
        hasher.update(order.side.to_string());
        hasher.update(b":");
        hasher.update(order.quantity.to_string());
        hasher.update(b":");
        hasher.update(order.limit_price.to_string());
        hasher.update(b":");
        hasher.update(dedup_key);

        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of claiming a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The fingerprint was free (or already owned by this order).
    Accepted,
    /// Another order already owns this fingerprint.
    Duplicate(OrderId),
}

/// Fingerprint-to-order map with a single-critical-section claim.
#[derive(Default)]
pub struct IdempotencyIndex {
    inner: Mutex<HashMap<Fingerprint, OrderId>>,
}

impl IdempotencyIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `fingerprint` for `order_id`.
    ///
    /// Inserts if absent. A fingerprint already mapped to the same
    /// order id is accepted, so the coordinator's synchronous claim and
    /// the pipeline's defensive re-claim compose without special
    /// casing.
    pub fn claim(&self, fingerprint: Fingerprint, order_id: OrderId) -> Claim {
        let mut inner = self.inner.lock();
        match inner.get(&fingerprint) {
            Some(&prior) if prior != order_id => {
                debug!(%fingerprint, %prior, "duplicate submission detected");
                Claim::Duplicate(prior)
            }
            Some(_) => Claim::Accepted,
            None => {
                inner.insert(fingerprint, order_id);
                Claim::Accepted
            }
        }
    }

    /// Number of retained fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
