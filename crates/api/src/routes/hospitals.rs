//! Route definitions for bulk hospital intake.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bulk;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/hospitals/bulk`.
///
/// ```text
/// POST   /                -> upload_bulk
/// GET    /{id}/status     -> get_status
/// GET    /{id}/results    -> get_results
/// POST   /{id}/retry      -> retry_bulk
/// GET    /{id}/live       -> live_progress (WebSocket)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(bulk::upload_bulk))
        .route("/{id}/status", get(bulk::get_status))
        .route("/{id}/results", get(bulk::get_results))
        .route("/{id}/retry", post(bulk::retry_bulk))
        .route("/{id}/live", get(ws::live_progress))
}
