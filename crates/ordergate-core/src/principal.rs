//! Authenticated identity.
//!
//! Authentication itself happens in the outer layer; the core only
//! receives an already-authenticated `Principal` and uses it for
//! attribution and role gating.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Role hierarchy, ordered by privilege.
///
/// The derived `Ord` gives `Trader < RiskManager < Compliance < Admin`;
/// a role satisfies a requirement when it is `>=` the required role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Trader,
    RiskManager,
    Compliance,
    Admin,
}

impl Role {
    /// Whether this role meets or exceeds `required`.
    #[must_use]
    pub fn permits(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trader => "TRADER",
            Self::RiskManager => "RISK_MANAGER",
            Self::Compliance => "COMPLIANCE",
            Self::Admin => "ADMIN",
        };
        write!(f, "{s}")
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            role,
        }
    }
}
