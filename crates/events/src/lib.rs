//! Batch event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`BatchEvent`]: the structured event envelope published by the batch
//!   processor.
//! - [`EventLogger`]: background consumer that reports every event through
//!   `tracing`.

pub mod bus;
pub mod logger;

pub use bus::{BatchEvent, EventBus};
pub use logger::EventLogger;
