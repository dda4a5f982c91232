//! Tracing-backed event consumer.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! reports every [`BatchEvent`] as a structured log line. Row and
//! activation failures are logged at `warn`, everything else at `info`.
//! It shuts down when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::{BatchEvent, EVENT_ACTIVATION_FAILED, EVENT_ROW_FAILED};

pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the channel closes.
    ///
    /// Returns the number of events logged.
    pub async fn run(mut receiver: broadcast::Receiver<BatchEvent>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::log(&event);
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some batch events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
        logged
    }

    fn log(event: &BatchEvent) {
        match event.event_type.as_str() {
            EVENT_ROW_FAILED | EVENT_ACTIVATION_FAILED => tracing::warn!(
                event_type = %event.event_type,
                batch_id = %event.batch_id,
                payload = %event.payload,
                "Batch event"
            ),
            _ => tracing::info!(
                event_type = %event.event_type,
                batch_id = %event.batch_id,
                payload = %event.payload,
                "Batch event"
            ),
        }
    }
}
