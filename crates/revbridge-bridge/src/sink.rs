//! Post-commit event delivery.
//!
//! The event log table is the durable record; a sink is a live feed for
//! in-process subscribers (the daemon's event bus, tests). Delivery is
//! best-effort and never affects the outcome of the call that produced it.

use std::sync::{Arc, Mutex, PoisonError};

use revbridge_types::EventRecord;

/// Receiver for committed events, in sequence order.
pub trait EventSink: Send {
    fn publish(&self, record: &EventRecord);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _record: &EventRecord) {}
}

/// Keeps every published event in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl RecordingSink {
    /// Snapshot of everything published so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Event type names in publish order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.event.event_type())
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, record: &EventRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
