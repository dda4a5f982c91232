pub mod health;
pub mod hospitals;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /hospitals/bulk                      upload CSV (POST)
/// /hospitals/bulk/{id}/status          progress snapshot (GET)
/// /hospitals/bulk/{id}/results         final result (GET)
/// /hospitals/bulk/{id}/retry           retry failed rows (POST)
/// /hospitals/bulk/{id}/live            progress stream (WebSocket)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/hospitals/bulk", hospitals::router())
}
