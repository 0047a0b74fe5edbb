//! Server library: configuration and the composition root.
//!
//! Split from the binary so integration tests can build the full
//! component graph with a test executor injected at the seam.

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
