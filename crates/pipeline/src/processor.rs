//! Batch processor: drives one pass of a batch from `queued` to a terminal
//! status.
//!
//! Rows are submitted strictly in order, one at a time. A failed row is
//! recorded and staged for retry but never stops the pass. Once every row
//! has been attempted the pass's results are merged with the surviving
//! rows of the previous pass (on retry), activation is attempted when
//! nothing failed, and the terminal snapshot is written to the store.

use std::sync::Arc;
use std::time::Instant;

use hospital_core::batch::{FinalResult, IndexedRow, RowResult, RowStatus};
use hospital_core::directory::{CreateHospital, DirectoryClient};
use hospital_core::error::CoreError;
use hospital_core::store::BatchStore;
use hospital_core::types::BatchId;
use hospital_events::bus::{
    EVENT_ACTIVATION_FAILED, EVENT_PASS_FINISHED, EVENT_PASS_STARTED, EVENT_ROW_FAILED,
};
use hospital_events::{BatchEvent, EventBus};

pub struct BatchProcessor {
    store: Arc<dyn BatchStore>,
    directory: Arc<dyn DirectoryClient>,
    events: Arc<EventBus>,
}

impl BatchProcessor {
    pub fn new(
        store: Arc<dyn BatchStore>,
        directory: Arc<dyn DirectoryClient>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            directory,
            events,
        }
    }

    /// Run one pass over `rows` for a batch already initialized in the
    /// store, and return the stored terminal snapshot.
    ///
    /// Errors only come from the store (e.g. the batch is unknown); directory
    /// failures are absorbed into row results and the `activated` flag.
    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn run_pass(
        &self,
        batch_id: BatchId,
        rows: Vec<IndexedRow>,
    ) -> Result<FinalResult, CoreError> {
        let started = Instant::now();

        self.store.mark_processing(batch_id).await?;
        self.events.publish(
            BatchEvent::new(EVENT_PASS_STARTED, batch_id)
                .with_payload(serde_json::json!({ "rows": rows.len() })),
        );

        for row in rows {
            self.submit_row(batch_id, row).await?;
        }

        let previous = self.store.final_result(batch_id).await?;
        let pass = self.store.pass_results(batch_id).await?;
        let mut hospitals = merge_results(previous.as_ref(), pass);

        let failed = hospitals.iter().filter(|r| r.is_failed()).count();
        let processed = hospitals.len() - failed;

        let activated = if failed == 0 {
            self.activate(batch_id, &mut hospitals).await
        } else {
            false
        };

        let result = FinalResult {
            batch_id,
            total_hospitals: self.store.original_total(batch_id).await?,
            processed_hospitals: processed,
            failed_hospitals: failed,
            processing_time_seconds: round_centis(started.elapsed().as_secs_f64()),
            batch_activated: activated,
            completed_at: chrono::Utc::now(),
            hospitals,
        };

        self.store.finalize(batch_id, result.clone()).await?;

        tracing::info!(
            status = %result.status(),
            processed,
            failed,
            activated,
            elapsed_secs = result.processing_time_seconds,
            "Batch pass finished",
        );
        self.events.publish(
            BatchEvent::new(EVENT_PASS_FINISHED, batch_id).with_payload(serde_json::json!({
                "status": result.status(),
                "processed": processed,
                "failed": failed,
                "activated": activated,
            })),
        );

        Ok(result)
    }

    /// Submit a single row and record its outcome.
    async fn submit_row(&self, batch_id: BatchId, indexed: IndexedRow) -> Result<(), CoreError> {
        let request = CreateHospital {
            name: indexed.hospital.name.clone(),
            address: indexed.hospital.address.clone(),
            phone: indexed.hospital.phone.clone(),
            creation_batch_id: batch_id,
        };

        match self.directory.create_hospital(&request).await {
            Ok(created) => {
                tracing::debug!(row = indexed.row, hospital_id = created.id, "Hospital created");
                self.store
                    .record_success(batch_id, RowResult::created(indexed.row, created.id, created.name))
                    .await
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(row = indexed.row, error = %error, "Hospital creation failed");
                self.events.publish(
                    BatchEvent::new(EVENT_ROW_FAILED, batch_id).with_payload(serde_json::json!({
                        "row": indexed.row,
                        "name": indexed.hospital.name,
                        "error": error,
                    })),
                );
                let result = RowResult::failed(indexed.row, indexed.hospital.name.clone(), error);
                self.store.record_failure(batch_id, result, indexed).await
            }
        }
    }

    /// Activate the batch. On success every created row is marked
    /// activated; on failure rows are left untouched.
    async fn activate(&self, batch_id: BatchId, hospitals: &mut [RowResult]) -> bool {
        match self.directory.activate_batch(batch_id).await {
            Ok(()) => {
                for row in hospitals.iter_mut() {
                    if row.status == RowStatus::Created {
                        row.status = RowStatus::CreatedAndActivated;
                    }
                }
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Batch activation failed");
                self.events.publish(
                    BatchEvent::new(EVENT_ACTIVATION_FAILED, batch_id)
                        .with_payload(serde_json::json!({ "error": e.to_string() })),
                );
                false
            }
        }
    }
}

/// Combine the previous snapshot's non-failed rows with this pass's rows.
///
/// Rows re-submitted in this pass replace their earlier entry. The result is
/// ordered by original row index.
fn merge_results(previous: Option<&FinalResult>, pass: Vec<RowResult>) -> Vec<RowResult> {
    let mut merged: Vec<RowResult> = previous
        .map(|prev| {
            prev.hospitals
                .iter()
                .filter(|r| !r.is_failed() && !pass.iter().any(|p| p.row == r.row))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    merged.extend(pass);
    merged.sort_by_key(|r| r.row);
    merged
}

fn round_centis(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
