//! Layout invalidation stream
//!
//! Every connected screen receives every `layout_updated` event as a JSON
//! text frame and filters by page itself. Delivery is at-most-once: events
//! published while a client is disconnected are not replayed, so clients
//! refetch after reconnecting.

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::http::AppState;

/// `GET /ws/layout`
pub async fn websocket_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    // Clients never send anything beyond control frames
    ws.max_message_size(state.realtime.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut subscription = state.hub.connect();
    let session_id = subscription.id().to_string();
    info!(session_id = %session_id, "Layout stream connected");

    let (mut sink, mut stream) = socket.split();

    let ping_every = Duration::from_secs(state.realtime.ping_interval_seconds.max(1));
    let writer_session = session_id.clone();
    let mut writer = tokio::spawn(async move {
        let mut ping = interval_at(Instant::now() + ping_every, ping_every);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let message = tokio::select! {
                event = subscription.recv() => {
                    // Hub closed during shutdown
                    let Some(event) = event else { break };
                    match serde_json::to_string(&event) {
                        Ok(text) => Message::Text(text.into()),
                        Err(e) => {
                            warn!(session_id = %writer_session, error = %e, "Failed to encode layout event");
                            continue;
                        }
                    }
                }
                _ = ping.tick() => Message::Ping(Bytes::new()),
            };

            if let Err(e) = sink.send(message).await {
                debug!(session_id = %writer_session, error = %e, "Layout stream send failed");
                break;
            }
        }

        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,
            message = stream.next() => match message {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(session_id = %session_id, error = %e, "Layout stream read failed");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    writer.abort();
    info!(session_id = %session_id, "Layout stream closed");
}
