//! Live event feed.
//!
//! The bridge publishes each committed [`EventRecord`] to the [`EventBus`],
//! which fans it out to RPC subscribers. Each subscriber has an independent
//! buffer; a subscriber that falls behind by more than the buffer skips
//! ahead and can backfill from `get_events`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use revbridge_bridge::EventSink;
use revbridge_types::{EventRecord, SettlementId};

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only these event types (e.g. "RevenueBridged").
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    /// Only events concerning this settlement.
    #[serde(default)]
    pub settlement_id: Option<SettlementId>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventRecord>,
    published: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, record: EventRecord) {
        self.published.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(record);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Number of events emitted since startup.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }
}

impl EventSink for EventBus {
    fn publish(&self, record: &EventRecord) {
        self.emit(record.clone());
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(ref types) = self.event_types {
            let event_type = record.event.event_type();
            if !types.iter().any(|t| t == event_type) {
                return false;
            }
        }

        if let Some(ref wanted) = self.settlement_id {
            if record.event.settlement_id().as_ref() != Some(wanted) {
                return false;
            }
        }

        true
    }
}
