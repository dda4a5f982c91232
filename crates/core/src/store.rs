//! Batch state store.
//!
//! [`BatchStore`] is the only place batch progress, results and pending
//! retry rows live. The processor, the progress publisher and the HTTP
//! handlers all receive it as an injected `Arc<dyn BatchStore>`.
//!
//! [`InMemoryBatchStore`] keeps one mutex per batch. The outer map lock is
//! held only long enough to look up or insert a batch slot, so updates to
//! one batch never block readers of another.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::batch::{BatchProgress, BatchStatus, FinalResult, IndexedRow, RowResult};
use crate::error::CoreError;
use crate::types::BatchId;

#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Start a pass over `total` rows with status `queued` and zero counts.
    ///
    /// The first call for a batch records `total` as the batch's original
    /// total. Later calls (retries) reset only the pass progress and keep
    /// the last final result for merging.
    async fn init(&self, batch_id: BatchId, total: usize);

    /// Move a queued pass to `processing`.
    async fn mark_processing(&self, batch_id: BatchId) -> Result<(), CoreError>;

    /// Record a created row: bump `processed` and append the result.
    async fn record_success(&self, batch_id: BatchId, result: RowResult) -> Result<(), CoreError>;

    /// Record a failed row: bump `failed`, append the result and stage the
    /// input row for the pending-retry set.
    async fn record_failure(
        &self,
        batch_id: BatchId,
        result: RowResult,
        row: IndexedRow,
    ) -> Result<(), CoreError>;

    /// Results recorded so far in the current pass, in submission order.
    async fn pass_results(&self, batch_id: BatchId) -> Result<Vec<RowResult>, CoreError>;

    /// Store the terminal snapshot, switch the pass to its terminal status
    /// and publish the pass's failed rows as the pending-retry set.
    async fn finalize(&self, batch_id: BatchId, result: FinalResult) -> Result<(), CoreError>;

    async fn progress(&self, batch_id: BatchId) -> Result<BatchProgress, CoreError>;

    /// Latest terminal snapshot, `None` until the first pass finishes.
    async fn final_result(&self, batch_id: BatchId) -> Result<Option<FinalResult>, CoreError>;

    /// Row count of the batch's first upload.
    async fn original_total(&self, batch_id: BatchId) -> Result<usize, CoreError>;

    /// Remove and return the pending-retry rows.
    ///
    /// Fails with [`CoreError::NoPendingRetry`] when nothing is pending,
    /// which is always the case while a pass is queued or running.
    async fn take_pending_retry(&self, batch_id: BatchId) -> Result<Vec<IndexedRow>, CoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct BatchEntry {
    original_total: usize,
    progress: BatchProgress,
    pass_results: Vec<RowResult>,
    /// Failed rows of the running pass; moved to `pending_retry` on finalize.
    staged_failures: Vec<IndexedRow>,
    pending_retry: Vec<IndexedRow>,
    final_result: Option<FinalResult>,
}

impl BatchEntry {
    fn new(total: usize) -> Self {
        Self {
            original_total: total,
            progress: BatchProgress::queued(total),
            pass_results: Vec::new(),
            staged_failures: Vec::new(),
            pending_retry: Vec::new(),
            final_result: None,
        }
    }
}

/// Process-local [`BatchStore`]. State is lost on restart.
#[derive(Default)]
pub struct InMemoryBatchStore {
    batches: RwLock<HashMap<BatchId, Arc<Mutex<BatchEntry>>>>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, batch_id: BatchId) -> Result<Arc<Mutex<BatchEntry>>, CoreError> {
        self.batches
            .read()
            .await
            .get(&batch_id)
            .cloned()
            .ok_or_else(|| CoreError::batch_not_found(batch_id))
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn init(&self, batch_id: BatchId, total: usize) {
        let existing = self.batches.read().await.get(&batch_id).cloned();
        match existing {
            Some(slot) => {
                let mut entry = slot.lock().await;
                entry.progress = BatchProgress::queued(total);
                entry.pass_results.clear();
                entry.staged_failures.clear();
            }
            None => {
                self.batches
                    .write()
                    .await
                    .entry(batch_id)
                    .or_insert_with(|| Arc::new(Mutex::new(BatchEntry::new(total))));
            }
        }
    }

    async fn mark_processing(&self, batch_id: BatchId) -> Result<(), CoreError> {
        let slot = self.slot(batch_id).await?;
        slot.lock().await.progress.status = BatchStatus::Processing;
        Ok(())
    }

    async fn record_success(&self, batch_id: BatchId, result: RowResult) -> Result<(), CoreError> {
        let slot = self.slot(batch_id).await?;
        let mut entry = slot.lock().await;
        entry.progress.processed += 1;
        entry.pass_results.push(result);
        Ok(())
    }

    async fn record_failure(
        &self,
        batch_id: BatchId,
        result: RowResult,
        row: IndexedRow,
    ) -> Result<(), CoreError> {
        let slot = self.slot(batch_id).await?;
        let mut entry = slot.lock().await;
        entry.progress.failed += 1;
        entry.pass_results.push(result);
        entry.staged_failures.push(row);
        Ok(())
    }

    async fn pass_results(&self, batch_id: BatchId) -> Result<Vec<RowResult>, CoreError> {
        let slot = self.slot(batch_id).await?;
        let results = slot.lock().await.pass_results.clone();
        Ok(results)
    }

    async fn finalize(&self, batch_id: BatchId, result: FinalResult) -> Result<(), CoreError> {
        let slot = self.slot(batch_id).await?;
        let mut entry = slot.lock().await;
        entry.progress.status = result.status();
        entry.pending_retry = std::mem::take(&mut entry.staged_failures);
        entry.final_result = Some(result);
        Ok(())
    }

    async fn progress(&self, batch_id: BatchId) -> Result<BatchProgress, CoreError> {
        let slot = self.slot(batch_id).await?;
        let progress = slot.lock().await.progress.clone();
        Ok(progress)
    }

    async fn final_result(&self, batch_id: BatchId) -> Result<Option<FinalResult>, CoreError> {
        let slot = self.slot(batch_id).await?;
        let result = slot.lock().await.final_result.clone();
        Ok(result)
    }

    async fn original_total(&self, batch_id: BatchId) -> Result<usize, CoreError> {
        let slot = self.slot(batch_id).await?;
        let total = slot.lock().await.original_total;
        Ok(total)
    }

    async fn take_pending_retry(&self, batch_id: BatchId) -> Result<Vec<IndexedRow>, CoreError> {
        let slot = self.slot(batch_id).await?;
        let mut entry = slot.lock().await;
        if entry.pending_retry.is_empty() {
            return Err(CoreError::NoPendingRetry(batch_id));
        }
        Ok(std::mem::take(&mut entry.pending_retry))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
