//! Live progress publisher.
//!
//! Each subscription gets its own task that reads the store on a fixed
//! interval and pushes [`ProgressFrame`]s into a bounded channel:
//!
//! - unknown batch: one error frame, then the stream ends;
//! - otherwise one snapshot per tick, ending right after the first
//!   snapshot with a terminal status.
//!
//! The task also ends as soon as the subscriber drops the stream.

use std::sync::Arc;
use std::time::Duration;

use hospital_core::batch::BatchProgress;
use hospital_core::error::CoreError;
use hospital_core::store::BatchStore;
use hospital_core::types::BatchId;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Frames buffered per subscriber before the publisher waits.
const FRAME_BUFFER: usize = 16;

/// One message on a live progress stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProgressFrame {
    Snapshot(BatchProgress),
    Error { error: String },
}

impl ProgressFrame {
    /// Frame sent once for a batch id that does not exist.
    pub fn not_found() -> Self {
        Self::Error {
            error: "Batch not found".to_string(),
        }
    }
}

pub struct ProgressPublisher {
    store: Arc<dyn BatchStore>,
    interval: Duration,
}

impl ProgressPublisher {
    pub fn new(store: Arc<dyn BatchStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Start streaming progress for `batch_id`.
    pub fn subscribe(&self, batch_id: BatchId) -> ReceiverStream<ProgressFrame> {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        tokio::spawn(publish(Arc::clone(&self.store), self.interval, batch_id, tx));
        ReceiverStream::new(rx)
    }
}

async fn publish(
    store: Arc<dyn BatchStore>,
    interval: Duration,
    batch_id: BatchId,
    tx: mpsc::Sender<ProgressFrame>,
) {
    loop {
        let progress = match store.progress(batch_id).await {
            Ok(progress) => progress,
            Err(e) => {
                let frame = match e {
                    CoreError::NotFound { .. } => ProgressFrame::not_found(),
                    other => ProgressFrame::Error {
                        error: other.to_string(),
                    },
                };
                let _ = tx.send(frame).await;
                return;
            }
        };

        let terminal = progress.status.is_terminal();
        if tx.send(ProgressFrame::Snapshot(progress)).await.is_err() {
            tracing::debug!(%batch_id, "Progress subscriber went away");
            return;
        }
        if terminal {
            return;
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = tx.closed() => {
                tracing::debug!(%batch_id, "Progress subscriber went away");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hospital_core::batch::{BatchStatus, FinalResult, IndexedRow, RowResult};
    use hospital_core::ingest::HospitalRow;
    use hospital_core::store::InMemoryBatchStore;
    use tokio_stream::StreamExt;

    use super::*;

    const TICK: Duration = Duration::from_millis(5);

    fn final_result(batch_id: BatchId, hospitals: Vec<RowResult>) -> FinalResult {
        let failed = hospitals.iter().filter(|r| r.is_failed()).count();
        FinalResult {
            batch_id,
            total_hospitals: hospitals.len(),
            processed_hospitals: hospitals.len() - failed,
            failed_hospitals: failed,
            processing_time_seconds: 0.0,
            batch_activated: failed == 0,
            completed_at: chrono::Utc::now(),
            hospitals,
        }
    }

    #[tokio::test]
    async fn unknown_batch_yields_one_error_frame_then_ends() {
        let publisher = ProgressPublisher::new(Arc::new(InMemoryBatchStore::new()), TICK);

        let frames: Vec<_> = publisher.subscribe(BatchId::new_v4()).collect().await;

        assert_eq!(frames, vec![ProgressFrame::not_found()]);
        assert_eq!(
            serde_json::to_value(&frames[0]).unwrap(),
            serde_json::json!({"error": "Batch not found"})
        );
    }

    #[tokio::test]
    async fn terminal_batch_yields_single_snapshot() {
        let store = Arc::new(InMemoryBatchStore::new());
        let id = BatchId::new_v4();
        store.init(id, 1).await;
        store
            .record_success(id, RowResult::created(1, 1, "A"))
            .await
            .unwrap();
        store
            .finalize(id, final_result(id, vec![RowResult::created(1, 1, "A")]))
            .await
            .unwrap();

        let publisher = ProgressPublisher::new(store, TICK);
        let frames: Vec<_> = publisher.subscribe(id).collect().await;

        assert_eq!(frames.len(), 1);
        assert_eq!(
            serde_json::to_value(&frames[0]).unwrap(),
            serde_json::json!({"total": 1, "processed": 1, "failed": 0, "status": "completed"})
        );
    }

    #[tokio::test]
    async fn streams_until_batch_becomes_terminal() {
        let store = Arc::new(InMemoryBatchStore::new());
        let id = BatchId::new_v4();
        store.init(id, 2).await;
        store.mark_processing(id).await.unwrap();

        let publisher = ProgressPublisher::new(store.clone(), TICK);
        let mut stream = publisher.subscribe(id);

        let first = stream.next().await.unwrap();
        assert_matches::assert_matches!(
            first,
            ProgressFrame::Snapshot(BatchProgress { status: BatchStatus::Processing, .. })
        );

        store
            .record_success(id, RowResult::created(1, 1, "A"))
            .await
            .unwrap();
        let row = IndexedRow {
            row: 2,
            hospital: HospitalRow::new("B", "2 Oak Ave", None),
        };
        store
            .record_failure(id, RowResult::failed(2, "B", "boom"), row)
            .await
            .unwrap();
        let results = store.pass_results(id).await.unwrap();
        store.finalize(id, final_result(id, results)).await.unwrap();

        let rest: Vec<_> = stream.collect().await;
        let last = rest.last().unwrap();
        assert_eq!(
            last,
            &ProgressFrame::Snapshot(BatchProgress {
                total: 2,
                processed: 1,
                failed: 1,
                status: BatchStatus::PartialFailed,
            })
        );
        for frame in &rest {
            if let ProgressFrame::Snapshot(p) = frame {
                assert!(p.attempted() <= p.total);
            }
        }
    }

    #[tokio::test]
    async fn stops_when_subscriber_drops() {
        let store = Arc::new(InMemoryBatchStore::new());
        let id = BatchId::new_v4();
        store.init(id, 5).await;

        let publisher = ProgressPublisher::new(store.clone(), Duration::from_secs(60));
        let mut stream = publisher.subscribe(id);
        assert!(stream.next().await.is_some());
        assert_eq!(Arc::strong_count(&store), 3);

        drop(stream);
        tokio::time::sleep(TICK * 4).await;

        // The publishing task has released its handle on the store.
        assert_eq!(Arc::strong_count(&store), 2);
    }
}
