use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt as _, StreamExt as _};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Forwards broadcast frames to one client until either side goes away.
/// A new client first receives the most recent data frame.
async fn handle_socket(socket: WebSocket, state: AppState) {
    tracing::info!(clients = state.tx.receiver_count() + 1, "WebSocket connected");

    let (latest, updates) = state.subscribe().await;

    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        if let Some(frame) = latest
            && sink.send(Message::Text(frame.into())).await.is_err()
        {
            return;
        }

        let mut updates = updates;
        while let Some(next) = updates.next().await {
            let frame = match next {
                Ok(frame) => frame,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Slow WebSocket client skipped frames");
                    continue;
                }
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                tracing::debug!("WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!("WebSocket disconnected");
}
