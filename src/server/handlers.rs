use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::predict::{ErrorBody, PredictionRequest, PredictionResponse};

use super::{feed::Feed, AppState};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub async fn stream_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_updates(socket, state.feed, state.stopping))
}

/// Sends the current window, then forwards every broadcast frame until either
/// side goes away or the server stops.
async fn stream_updates(socket: WebSocket, feed: Feed, stopping: CancellationToken) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the snapshot so no tick falls between the two.
    let mut updates = feed.subscribe();
    log_info!("client {} connected", connection_id);

    let initial = match feed.snapshot().await {
        Ok(frame) => frame,
        Err(err) => {
            log_warn!("client {}: could not encode window: {err:#}", connection_id);
            return;
        }
    };
    if sender.send(Message::Text(initial)).await.is_err() {
        log_info!("client {} left before the first frame", connection_id);
        return;
    }

    loop {
        tokio::select! {
            _ = stopping.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            update = updates.recv() => match update {
                Ok(frame) => {
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log_warn!("client {} lagging, skipped {} frames", connection_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => log_debug!("client {} sent an ignored message", connection_id),
            },
        }
    }

    log_info!("client {} disconnected", connection_id);
}

/// `POST /predict`: `{ elapsedtime, velocity }` to `{ prediction }`.
pub async fn predict_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request: PredictionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            log_debug!("rejected prediction request: {}", err);
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: format!("invalid prediction request: {err}"),
                }),
            )
                .into_response();
        }
    };

    let prediction = state.model.predict(request.elapsedtime, request.velocity);
    Json(PredictionResponse { prediction }).into_response()
}
