//! Identifier newtypes.
//!
//! Orders, correlation chains, and events each carry a process-unique
//! identifier. Wrapping `Uuid` in distinct newtypes prevents an order
//! id from being passed where a correlation id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Unique identifier assigned to an order on acceptance.
    OrderId
}

uuid_id! {
    /// Opaque identifier shared by all events arising from one user
    /// action; enables end-to-end tracing and replay.
    CorrelationId
}

uuid_id! {
    /// Globally unique identifier of a journal event.
    EventId
}

/// Caller-supplied order identifier used for idempotent submission.
///
/// Two submissions from the same user with the same parameters and the
/// same `ClientOrderId` resolve to a single order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_unique() {
        assert_ne!(OrderId::generate(), OrderId::generate());
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
        assert_ne!(EventId::generate(), EventId::generate());
    }

    #[test]
    fn test_order_id_roundtrip() {
        let id = OrderId::generate();
        let parsed: OrderId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_client_order_id_from_string() {
        let id = ClientOrderId::new("k1");
        assert_eq!(id.as_str(), "k1");
        assert_eq!(ClientOrderId::from("k1".to_string()), id);
    }
}
