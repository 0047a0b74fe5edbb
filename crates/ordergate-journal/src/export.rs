//! JSON Lines audit export.
//!
//! Mirrors the journal to `events_YYYY-MM-DD.jsonl` files, one JSON
//! object per line. Files are opened in append mode and rotated at the
//! UTC date boundary, so an interrupted write corrupts at most one
//! line and restarts never truncate history.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ordergate_core::Event;

use crate::error::JournalResult;

/// Exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Directory for the daily files.
    pub data_dir: String,
    /// Number of events buffered before a flush to disk.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    64
}

struct ActiveFile {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

/// Buffered JSON Lines writer for journal events.
pub struct AuditExporter {
    data_dir: String,
    buffer: Vec<String>,
    max_buffer_size: usize,
    active: Option<ActiveFile>,
}

impl AuditExporter {
    /// Create an exporter rooted at `config.data_dir`.
    ///
    /// The directory is created if missing; failure to create it is
    /// deferred to the first flush.
    #[must_use]
    pub fn new(config: &ExporterConfig) -> Self {
        if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
            warn!(?e, dir = %config.data_dir, "failed to create export directory");
        }

        Self {
            data_dir: config.data_dir.clone(),
            buffer: Vec::with_capacity(config.buffer_size),
            max_buffer_size: config.buffer_size.max(1),
            active: None,
        }
    }

    /// Queue one event; flushes when the buffer is full.
    pub fn add_event(&mut self, event: &Event) -> JournalResult<()> {
        self.buffer.push(serde_json::to_string(event)?);

        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }

        Ok(())
    }

    /// Write all buffered lines to the current daily file.
    pub fn flush(&mut self) -> JournalResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();

        let needs_rotation = self
            .active
            .as_ref()
            .map(|a| a.date != today)
            .unwrap_or(false);
        if needs_rotation {
            self.close_active();
        }

        if self.active.is_none() {
            self.open_for(&today)?;
        }

        let active = self.active.as_mut().expect("active file just opened");
        for line in &self.buffer {
            writeln!(active.writer, "{line}")?;
        }
        active.writer.flush()?;
        active.records_written += self.buffer.len();
        self.buffer.clear();

        Ok(())
    }

    /// Flush pending lines and close the current file.
    pub fn close(&mut self) -> JournalResult<()> {
        self.flush()?;
        self.close_active();
        Ok(())
    }

    fn open_for(&mut self, date: &str) -> JournalResult<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        let filename = format!("{}/events_{}.jsonl", self.data_dir, date);
        info!(filename = %filename, "opening audit export file");

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)?;

        self.active = Some(ActiveFile {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        });
        Ok(())
    }

    fn close_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "failed to flush audit export on close");
            }
            info!(
                date = %active.date,
                records = active.records_written,
                "closed audit export file"
            );
        }
    }
}

impl Drop for AuditExporter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, "failed to flush audit export on drop");
        }
        self.close_active();
    }
}
