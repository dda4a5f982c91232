use std::sync::Arc;

use hospital_core::directory::DirectoryClient;
use hospital_core::store::{BatchStore, InMemoryBatchStore};
use hospital_events::EventBus;
use hospital_pipeline::{BatchProcessor, BatchRunner, ProgressPublisher};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything lives behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Batch progress, results and pending retries.
    pub store: Arc<dyn BatchStore>,
    /// Starts first passes and retries in the background.
    pub runner: Arc<BatchRunner>,
    /// Feeds the live progress WebSocket.
    pub publisher: Arc<ProgressPublisher>,
}

impl AppState {
    /// Wire an in-memory store, processor, runner and publisher around the
    /// given directory client and event bus.
    pub fn new(
        config: ServerConfig,
        directory: Arc<dyn DirectoryClient>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let store: Arc<dyn BatchStore> = Arc::new(InMemoryBatchStore::new());
        let processor = Arc::new(BatchProcessor::new(
            Arc::clone(&store),
            directory,
            event_bus,
        ));
        let runner = Arc::new(BatchRunner::new(Arc::clone(&store), processor));
        let publisher = Arc::new(ProgressPublisher::new(
            Arc::clone(&store),
            config.progress_interval(),
        ));

        Self {
            config: Arc::new(config),
            store,
            runner,
            publisher,
        }
    }
}
