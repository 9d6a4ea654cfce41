//! Per-job WebSocket progress stream.
//!
//! On connect the client receives a `JobSnapshot` frame, then every event
//! concerning that job as it is published. Any text frame from the client
//! triggers a fresh snapshot.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{ApiError, AppState};

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.runner.store().get(job_id)?;
    Ok(ws.on_upgrade(move |socket| handle_ws_connection(socket, state, job_id)))
}

fn snapshot_frame(state: &AppState, job_id: Uuid) -> Option<Message> {
    let job = state.runner.store().get(job_id).ok()?;
    let json = serde_json::json!({ "type": "JobSnapshot", "job": job });
    Some(Message::Text(json.to_string()))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState, job_id: Uuid) {
    let count = state.ws_connections.fetch_add(1, Ordering::Relaxed) + 1;
    tracing::info!(active = count, job_id = %job_id, "WebSocket connection opened");

    // Subscribe before the snapshot so no event falls between the two.
    let mut event_rx = state.runner.store().subscribe();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;

    if let Some(frame) = snapshot_frame(&state, job_id) {
        if socket.send(frame).await.is_err() {
            close(&state, job_id);
            return;
        }
    }

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Ok(envelope) if envelope.job_id() == job_id => {
                        let Ok(json) = serde_json::to_string(&envelope.payload) else {
                            continue;
                        };
                        if socket.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        tracing::debug!(missed = n, "WebSocket client lagged");
                        // Resynchronise with a snapshot.
                        if let Some(frame) = snapshot_frame(&state, job_id) {
                            if socket.send(frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(_))) => {
                        if let Some(frame) = snapshot_frame(&state, job_id) {
                            if socket.send(frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = ping_interval.tick() => {
                if socket.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        }
    }

    close(&state, job_id);
}

fn close(state: &AppState, job_id: Uuid) {
    let count = state.ws_connections.fetch_sub(1, Ordering::Relaxed) - 1;
    tracing::info!(active = count, job_id = %job_id, "WebSocket connection closed");
}
