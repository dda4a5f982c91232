//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`BatchEvent`]s. It is
//! shared via `Arc<EventBus>` between the batch runner and its consumers.

use chrono::{DateTime, Utc};
use hospital_core::types::BatchId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const EVENT_PASS_STARTED: &str = "batch.pass_started";
pub const EVENT_ROW_FAILED: &str = "batch.row_failed";
pub const EVENT_ACTIVATION_FAILED: &str = "batch.activation_failed";
pub const EVENT_PASS_FINISHED: &str = "batch.pass_finished";

// ---------------------------------------------------------------------------
// BatchEvent
// ---------------------------------------------------------------------------

/// Something that happened while processing a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEvent {
    /// Dot-separated event name, e.g. `"batch.row_failed"`.
    pub event_type: String,

    pub batch_id: BatchId,

    /// Event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl BatchEvent {
    /// Create an event with an empty object payload.
    pub fn new(event_type: impl Into<String>, batch_id: BatchId) -> Self {
        Self {
            event_type: event_type.into(),
            batch_id,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<BatchEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is silently dropped.
    pub fn publish(&self, event: BatchEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
