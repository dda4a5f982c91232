//! Handlers for bulk hospital intake under `/hospitals/bulk`.
//!
//! Uploads and retries only start a background pass and return right
//! away; progress and results are read back from the batch store.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hospital_core::batch::{BatchProgress, FinalResult};
use hospital_core::ingest::parse_hospital_csv;
use hospital_core::types::{parse_batch_id, BatchId};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the CSV upload.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub batch_id: BatchId,
    pub total_hospitals: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub batch_id: BatchId,
    pub retrying_hospitals: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull the `file` field out of the multipart body as `(filename, bytes)`.
async fn read_csv_upload(multipart: &mut Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        return Ok((filename, data.to_vec()));
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// POST /api/v1/hospitals/bulk
///
/// Validate the uploaded CSV and start processing it. Returns 201 with the
/// new batch id; nothing is stored when validation fails.
pub async fn upload_bulk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let (filename, data) = read_csv_upload(&mut multipart).await?;
    let rows = parse_hospital_csv(&filename, &data, state.config.max_csv_rows)?;

    let started = state.runner.submit(rows).await;

    tracing::info!(
        batch_id = %started.batch_id,
        rows = started.rows,
        filename = %filename,
        "Bulk upload accepted",
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            batch_id: started.batch_id,
            total_hospitals: started.rows,
            message: "Batch processing started".to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/hospitals/bulk/{id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BatchProgress>> {
    let batch_id = parse_batch_id(&id)?;
    let progress = state.store.progress(batch_id).await?;
    Ok(Json(progress))
}

/// GET /api/v1/hospitals/bulk/{id}/results
///
/// Returns the final result once the current pass is terminal, or 202 with
/// a message while the batch is still queued or processing.
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let batch_id = parse_batch_id(&id)?;
    let progress = state.store.progress(batch_id).await?;
    if !progress.status.is_terminal() {
        let body = PendingResponse {
            message: format!("Batch is still {}. Check back later.", progress.status),
        };
        return Ok((StatusCode::ACCEPTED, Json(body)).into_response());
    }

    let result: FinalResult = state.store.final_result(batch_id).await?.ok_or_else(|| {
        AppError::InternalError(format!("Batch {batch_id} is terminal without a result"))
    })?;
    Ok(Json(result).into_response())
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// POST /api/v1/hospitals/bulk/{id}/retry
///
/// Resubmit the rows that failed in the batch's last pass. Returns 202;
/// 409 if there is nothing pending (including while a pass is running).
pub async fn retry_bulk(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let batch_id = parse_batch_id(&id)?;
    let started = state.runner.retry(batch_id).await?;

    tracing::info!(batch_id = %batch_id, rows = started.rows, "Bulk retry accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(RetryResponse {
            batch_id,
            retrying_hospitals: started.rows,
            message: format!("Retrying {} failed hospitals", started.rows),
        }),
    ))
}
