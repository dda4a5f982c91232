use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::stream::{self, BoxStream};
use futures::{SinkExt, StreamExt};
use hospital_core::types::parse_batch_id;
use hospital_pipeline::ProgressFrame;

use crate::state::AppState;

/// GET /api/v1/hospitals/bulk/{id}/live
///
/// Upgrades to a WebSocket that receives one JSON text frame per progress
/// tick and is closed by the server once the batch is terminal. Unknown
/// ids, including ones that are not UUIDs, get a single error frame.
pub async fn live_progress(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let frames = match parse_batch_id(&id) {
            Ok(batch_id) => state.publisher.subscribe(batch_id).boxed(),
            Err(_) => stream::once(async { ProgressFrame::not_found() }).boxed(),
        };
        stream_progress(socket, frames, id)
    })
}

/// Forward frames to the socket until the stream ends or the client goes
/// away.
async fn stream_progress(
    socket: WebSocket,
    mut frames: BoxStream<'static, ProgressFrame>,
    batch_id: String,
) {
    tracing::debug!(%batch_id, "Live progress subscriber connected");

    let (mut sink, mut inbound) = socket.split();

    loop {
        tokio::select! {
            frame = frames.next() => {
                let Some(frame) = frame else {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(%batch_id, error = %e, "Failed to encode progress frame");
                        break;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    tracing::debug!(%batch_id, "WebSocket sink closed");
                    break;
                }
            }
            msg = inbound.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(%batch_id, error = %e, "WebSocket receive error");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!(%batch_id, "Live progress subscriber disconnected");
}
