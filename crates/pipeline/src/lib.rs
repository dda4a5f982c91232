//! Batch processing pipeline.
//!
//! - [`processor`]: the per-batch state machine (sequential row submission,
//!   retry merging, activation, finalization).
//! - [`runner`]: starts batches and retries as tracked background tasks.
//! - [`publisher`]: streams progress snapshots to live subscribers.

pub mod processor;
pub mod publisher;
pub mod runner;

pub use processor::BatchProcessor;
pub use publisher::{ProgressFrame, ProgressPublisher};
pub use runner::{BatchRunner, StartedPass};

#[cfg(test)]
mod test_support;
