//! Starts batch passes as background tasks.
//!
//! Every pass runs in its own tokio task (no worker pool), tracked by a
//! [`TaskTracker`] so shutdown can wait for in-flight passes. Callers get
//! the task's [`JoinHandle`] back as the pass's completion future and are
//! free to drop it.

use std::sync::Arc;
use std::time::Duration;

use hospital_core::batch::{index_rows, FinalResult, IndexedRow};
use hospital_core::error::CoreError;
use hospital_core::ingest::HospitalRow;
use hospital_core::store::BatchStore;
use hospital_core::types::BatchId;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::processor::BatchProcessor;

/// A pass that has been queued and spawned.
#[derive(Debug)]
pub struct StartedPass {
    pub batch_id: BatchId,
    /// Number of rows submitted in this pass.
    pub rows: usize,
    pub handle: JoinHandle<Result<FinalResult, CoreError>>,
}

pub struct BatchRunner {
    store: Arc<dyn BatchStore>,
    processor: Arc<BatchProcessor>,
    tracker: TaskTracker,
}

impl BatchRunner {
    pub fn new(store: Arc<dyn BatchStore>, processor: Arc<BatchProcessor>) -> Self {
        Self {
            store,
            processor,
            tracker: TaskTracker::new(),
        }
    }

    /// Allocate a batch id for validated rows, queue it and start the first
    /// pass. Returns as soon as the task is spawned.
    pub async fn submit(&self, rows: Vec<HospitalRow>) -> StartedPass {
        let batch_id = BatchId::new_v4();
        let rows = index_rows(rows);
        self.store.init(batch_id, rows.len()).await;
        tracing::info!(%batch_id, rows = rows.len(), "Batch queued");
        self.spawn_pass(batch_id, rows)
    }

    /// Consume the batch's pending-retry rows and start a pass over them.
    ///
    /// Fails with `NotFound` for an unknown batch and `NoPendingRetry` when
    /// the last pass had no failures or a pass is still running.
    pub async fn retry(&self, batch_id: BatchId) -> Result<StartedPass, CoreError> {
        let rows = self.store.take_pending_retry(batch_id).await?;
        self.store.init(batch_id, rows.len()).await;
        tracing::info!(%batch_id, rows = rows.len(), "Batch retry queued");
        Ok(self.spawn_pass(batch_id, rows))
    }

    fn spawn_pass(&self, batch_id: BatchId, rows: Vec<IndexedRow>) -> StartedPass {
        let count = rows.len();
        let processor = Arc::clone(&self.processor);
        let handle = self.tracker.spawn(async move {
            let outcome = processor.run_pass(batch_id, rows).await;
            if let Err(e) = &outcome {
                tracing::error!(%batch_id, error = %e, "Batch pass aborted");
            }
            outcome
        });
        StartedPass {
            batch_id,
            rows: count,
            handle,
        }
    }

    /// Passes currently running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Close the tracker and wait up to `timeout` for running passes.
    /// Returns `false` if some were still running when the timeout elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use hospital_core::batch::BatchStatus;
    use hospital_core::store::InMemoryBatchStore;
    use hospital_events::EventBus;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::test_support::{rows, FakeDirectory};

    fn runner(directory: Arc<FakeDirectory>) -> (Arc<InMemoryBatchStore>, BatchRunner) {
        let store = Arc::new(InMemoryBatchStore::new());
        let processor = Arc::new(BatchProcessor::new(
            store.clone(),
            directory,
            Arc::new(EventBus::default()),
        ));
        let runner = BatchRunner::new(store.clone(), processor);
        (store, runner)
    }

    #[tokio::test]
    async fn submit_returns_before_processing_starts() {
        let (store, runner) = runner(Arc::new(FakeDirectory::new()));

        let started = runner.submit(rows(&["A", "B"])).await;

        assert_eq!(started.rows, 2);
        let progress = store.progress(started.batch_id).await.unwrap();
        assert_eq!(progress.status, BatchStatus::Queued);
        assert_eq!(progress.total, 2);

        let result = started.handle.await.unwrap().unwrap();
        assert_eq!(result.status(), BatchStatus::Completed);
    }

    #[tokio::test]
    async fn retry_is_rejected_while_pass_is_running() {
        let gate = Arc::new(Semaphore::new(0));
        let directory = Arc::new(FakeDirectory::new().failing(["B"]).gated(gate.clone()));
        let (store, runner) = runner(directory);

        let started = runner.submit(rows(&["A", "B", "C"])).await;
        while store.progress(started.batch_id).await.unwrap().status != BatchStatus::Processing {
            tokio::task::yield_now().await;
        }

        // The pass is parked on its first row until permits are released.
        assert_matches!(
            runner.retry(started.batch_id).await,
            Err(CoreError::NoPendingRetry(_))
        );

        gate.add_permits(4);
        started.handle.await.unwrap().unwrap();
        let retry = runner.retry(started.batch_id).await.unwrap();
        assert_eq!(retry.rows, 1);
        assert_matches!(
            runner.retry(started.batch_id).await,
            Err(CoreError::NoPendingRetry(_))
        );
        retry.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn retry_for_unknown_batch_is_not_found() {
        let (_store, runner) = runner(Arc::new(FakeDirectory::new()));

        assert_matches!(
            runner.retry(BatchId::new_v4()).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn batches_run_independently() {
        let directory = Arc::new(FakeDirectory::new().failing(["X"]));
        let (store, runner) = runner(directory);

        let clean = runner.submit(rows(&["A", "B"])).await;
        let dirty = runner.submit(rows(&["X", "Y"])).await;
        assert_ne!(clean.batch_id, dirty.batch_id);

        clean.handle.await.unwrap().unwrap();
        dirty.handle.await.unwrap().unwrap();

        assert_eq!(
            store.progress(clean.batch_id).await.unwrap().status,
            BatchStatus::Completed
        );
        assert_eq!(
            store.progress(dirty.batch_id).await.unwrap().status,
            BatchStatus::PartialFailed
        );
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight_passes() {
        let directory = Arc::new(FakeDirectory::new().with_delay(Duration::from_millis(20)));
        let (store, runner) = runner(directory);

        let started = runner.submit(rows(&["A", "B"])).await;
        assert_eq!(runner.in_flight(), 1);

        assert!(runner.shutdown(Duration::from_secs(5)).await);
        assert_eq!(runner.in_flight(), 0);
        assert!(store
            .progress(started.batch_id)
            .await
            .unwrap()
            .status
            .is_terminal());
    }
}
