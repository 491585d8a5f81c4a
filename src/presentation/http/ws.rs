use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use super::AppState;

/// Upgrade to a websocket that receives one JSON snapshot per tick.
pub async fn ws_metrics(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let rx = state.live.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<Arc<str>>) {
    tracing::info!("Live metrics client connected");
    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    if sink.send(Message::Text(payload.to_string().into())).await.is_err() {
                        tracing::debug!("Live metrics sink closed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Live metrics client lagging, snapshots dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Inbound frames are ignored; the loop only watches for disconnect.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Live metrics receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!("Live metrics client disconnected");
}
