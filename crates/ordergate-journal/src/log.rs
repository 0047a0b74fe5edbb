//! The in-memory event log.
//!
//! One writer lock on append; queries take the read lock and return a
//! snapshot slice of `Arc<Event>`s. The append lock is held only for
//! the insertion itself, never across caller work.
//!
//! Timestamps are wall-clock microseconds, clamped inside the append
//! lock so the log is strictly monotonic even when the clock stalls or
//! steps backwards: if the clock has not advanced past the previous
//! append, the new event gets `previous + 1µs`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use ordergate_core::{CorrelationId, Event, EventDraft, EventId, EventType, OrderId};

use crate::error::{JournalError, JournalResult};
use crate::export::AuditExporter;

/// Journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Maximum number of events held in memory. At capacity, appends
    /// fail with `CapacityExceeded` rather than evicting audit history.
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

fn default_max_events() -> usize {
    1_000_000
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
        }
    }
}

#[derive(Default)]
struct LogInner {
    events: Vec<Arc<Event>>,
    by_correlation: HashMap<CorrelationId, Vec<usize>>,
    by_order: HashMap<OrderId, Vec<usize>>,
    by_type: HashMap<EventType, Vec<usize>>,
    /// Microsecond timestamp of the most recent append.
    last_timestamp_us: i64,
}

/// Append-only, correlation-indexed event log.
pub struct EventLog {
    inner: RwLock<LogInner>,
    max_events: usize,
    exporter: Option<Mutex<AuditExporter>>,
}

impl EventLog {
    /// Create a memory-only log.
    #[must_use]
    pub fn new(config: JournalConfig) -> Self {
        Self {
            inner: RwLock::new(LogInner::default()),
            max_events: config.max_events,
            exporter: None,
        }
    }

    /// Create a log that mirrors every append to a JSON Lines exporter.
    ///
    /// With an exporter attached, `append` returns only after the event
    /// has been handed to the exporter, so a full export buffer is
    /// flushed to disk before the caller proceeds.
    #[must_use]
    pub fn with_exporter(config: JournalConfig, exporter: AuditExporter) -> Self {
        Self {
            inner: RwLock::new(LogInner::default()),
            max_events: config.max_events,
            exporter: Some(Mutex::new(exporter)),
        }
    }

    /// Append an event, assigning its id and a strictly increasing
    /// timestamp. Returns the stored event.
    pub fn append(&self, draft: EventDraft) -> JournalResult<Arc<Event>> {
        let event = {
            let mut inner = self.inner.write();

            if inner.events.len() >= self.max_events {
                return Err(JournalError::CapacityExceeded {
                    capacity: self.max_events,
                });
            }

            let now_us = Utc::now().timestamp_micros();
            let ts_us = now_us.max(inner.last_timestamp_us + 1);
            inner.last_timestamp_us = ts_us;

            let timestamp = DateTime::<Utc>::from_timestamp_micros(ts_us)
                .expect("journal timestamp within chrono range");

            let event = Arc::new(Event {
                event_id: EventId::generate(),
                correlation_id: draft.correlation_id,
                order_id: draft.order_id,
                timestamp,
                user_id: draft.user_id,
                kind: draft.kind,
            });

            let index = inner.events.len();
            inner.events.push(Arc::clone(&event));
            inner
                .by_correlation
                .entry(event.correlation_id)
                .or_default()
                .push(index);
            if let Some(order_id) = event.order_id {
                inner.by_order.entry(order_id).or_default().push(index);
            }
            inner
                .by_type
                .entry(event.event_type())
                .or_default()
                .push(index);

            event
        };

        if let Some(exporter) = &self.exporter {
            exporter.lock().add_event(&event)?;
        }

        trace!(
            event_type = %event.event_type(),
            correlation_id = %event.correlation_id,
            order_id = ?event.order_id,
            "event appended"
        );

        Ok(event)
    }

    /// All events in a correlation chain, in append order.
    #[must_use]
    pub fn by_correlation(&self, correlation_id: &CorrelationId) -> Vec<Arc<Event>> {
        let inner = self.inner.read();
        Self::collect(&inner, inner.by_correlation.get(correlation_id))
    }

    /// All events for an order, in append order.
    #[must_use]
    pub fn by_order(&self, order_id: &OrderId) -> Vec<Arc<Event>> {
        let inner = self.inner.read();
        Self::collect(&inner, inner.by_order.get(order_id))
    }

    /// Events of one type within an optional time window, in append
    /// order.
    #[must_use]
    pub fn by_type(
        &self,
        event_type: EventType,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Vec<Arc<Event>> {
        let inner = self.inner.read();
        let Some(indexes) = inner.by_type.get(&event_type) else {
            return Vec::new();
        };
        indexes
            .iter()
            .map(|&i| &inner.events[i])
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
            .filter(|e| until.map_or(true, |u| e.timestamp <= u))
            .map(Arc::clone)
            .collect()
    }

    /// The most recent events, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<Arc<Event>> {
        let inner = self.inner.read();
        inner
            .events
            .iter()
            .rev()
            .take(limit)
            .map(Arc::clone)
            .collect()
    }

    /// Total number of events appended.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().events.is_empty()
    }

    /// Flush the attached exporter, if any.
    pub fn flush_exporter(&self) -> JournalResult<()> {
        if let Some(exporter) = &self.exporter {
            exporter.lock().flush()?;
            debug!("audit exporter flushed");
        }
        Ok(())
    }

    fn collect(inner: &LogInner, indexes: Option<&Vec<usize>>) -> Vec<Arc<Event>> {
        indexes
            .map(|ixs| ixs.iter().map(|&i| Arc::clone(&inner.events[i])).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordergate_core::{EventKind, UserId};

    fn draft(kind: EventKind) -> EventDraft {
        EventDraft {
            correlation_id: CorrelationId::generate(),
            order_id: Some(OrderId::generate()),
            user_id: UserId::new("trader-1"),
            kind,
        }
    }

    fn log() -> EventLog {
        EventLog::new(JournalConfig::default())
    }

    #[test]
    fn test_append_assigns_strictly_increasing_timestamps() {
        let log = log();
        let mut last = None;
        for _ in 0..100 {
            let event = log.append(draft(EventKind::RiskCheckStarted)).unwrap();
            if let Some(prev) = last {
                assert!(event.timestamp > prev, "timestamps must strictly increase");
            }
            last = Some(event.timestamp);
        }
    }

    #[test]
    fn test_event_ids_unique() {
        let log = log();
        let a = log.append(draft(EventKind::RiskCheckStarted)).unwrap();
        let b = log.append(draft(EventKind::RiskCheckStarted)).unwrap();
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_by_correlation_preserves_append_order() {
        let log = log();
        let correlation_id = CorrelationId::generate();
        let order_id = OrderId::generate();

        for _ in 0..5 {
            log.append(EventDraft {
                correlation_id,
                order_id: Some(order_id),
                user_id: UserId::new("trader-1"),
                kind: EventKind::RiskCheckStarted,
            })
            .unwrap();
        }
        // Unrelated noise in between
        log.append(draft(EventKind::RiskCheckStarted)).unwrap();

        let chain = log.by_correlation(&correlation_id);
        assert_eq!(chain.len(), 5);
        for pair in chain.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }

        assert_eq!(log.by_order(&order_id).len(), 5);
    }

    #[test]
    fn test_by_type_filters_window() {
        let log = log();
        log.append(draft(EventKind::RiskCheckStarted)).unwrap();
        let marker = log.append(draft(EventKind::ExecutionStarted)).unwrap();
        log.append(draft(EventKind::ExecutionStarted)).unwrap();

        let all = log.by_type(EventType::ExecutionStarted, None, None);
        assert_eq!(all.len(), 2);

        let after = log.by_type(EventType::ExecutionStarted, Some(marker.timestamp), None);
        assert_eq!(after.len(), 2);

        let none = log.by_type(EventType::RiskCheckFailed, None, None);
        assert!(none.is_empty());
    }

    #[test]
    fn test_recent_newest_first() {
        let log = log();
        for _ in 0..10 {
            log.append(draft(EventKind::RiskCheckStarted)).unwrap();
        }
        let recent = log.recent(3);
        assert_eq!(recent.len(), 3);
        assert!(recent[0].timestamp > recent[1].timestamp);
        assert!(recent[1].timestamp > recent[2].timestamp);
    }

    #[test]
    fn test_capacity_policy_rejects_overflow() {
        let log = EventLog::new(JournalConfig { max_events: 2 });
        log.append(draft(EventKind::RiskCheckStarted)).unwrap();
        log.append(draft(EventKind::RiskCheckStarted)).unwrap();

        let err = log.append(draft(EventKind::RiskCheckStarted)).unwrap_err();
        assert!(matches!(
            err,
            JournalError::CapacityExceeded { capacity: 2 }
        ));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_append_visible_to_subsequent_queries() {
        let log = log();
        let event = log.append(draft(EventKind::RiskCheckStarted)).unwrap();
        let chain = log.by_correlation(&event.correlation_id);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].event_id, event.event_id);
    }
}
