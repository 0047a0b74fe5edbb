//! HTTP adapter for the ordergate trading control core.
//!
//! A thin axum surface over the component graph: order submission and
//! lookup, risk configuration, audit queries, health, and Prometheus
//! exposition. Authentication is bearer-JWT; the core only ever sees
//! an authenticated `Principal`.

pub mod auth;
pub mod error;
pub mod server;

pub use auth::{AuthConfig, AuthVerifier};
pub use error::{ApiError, ApiResult};
pub use server::{router, AppState};
