//! Append-only audit journal for the ordergate trading control core.
//!
//! The journal is the single source of truth for reconstructing order
//! and position state. Every append assigns a strictly increasing
//! timestamp and indexes the event by correlation id, order id, and
//! event type. Events are immutable and never deleted.
//!
//! An optional JSON Lines exporter mirrors the stream to daily-rotated
//! files for off-process archival.

pub mod error;
pub mod export;
pub mod log;

pub use error::{JournalError, JournalResult};
pub use export::{AuditExporter, ExporterConfig};
pub use log::{EventLog, JournalConfig};
