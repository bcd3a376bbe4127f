//! WebSocket route handler.
//!
//! Handles the upgrade, forwards broadcast messages to the socket, and
//! cleans up on disconnect. Observers only listen; incoming frames are
//! drained and ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::messages::ServerMessage;
use crate::server::state::GuardedConnectionManager;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(connection_manager): State<GuardedConnectionManager>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, connection_manager))
}

async fn handle_socket(socket: WebSocket, connection_manager: GuardedConnectionManager) {
    let (id, outgoing_rx) = connection_manager.register().await;
    debug!("observer {id} connected");

    let (ws_sink, ws_stream) = socket.split();

    let outgoing_handle = tokio::spawn(forward_outgoing(ws_sink, outgoing_rx));

    // Runs until the observer disconnects.
    drain_incoming(ws_stream).await;

    outgoing_handle.abort();
    connection_manager.unregister(id).await;
    debug!("observer {id} disconnected");
}

/// Forward broadcast messages to the socket until the channel or the
/// socket closes.
async fn forward_outgoing(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = outgoing_rx.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(err) => {
                debug!("failed to serialize broadcast message: {err}");
                continue;
            }
        };
        if ws_sink.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Consume incoming frames until the observer goes away.
async fn drain_incoming(mut ws_stream: SplitStream<WebSocket>) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}
