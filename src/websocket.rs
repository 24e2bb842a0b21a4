use axum::extract::ws::WebSocket;
use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::handlers::{self, WebSocketSend};
use crate::session::ClientSession;
use crate::state::AppState;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Forward every change of a watched flag to the client
fn forward_changes(
    mut rx: watch::Receiver<bool>,
    out: WebSocketSend,
    payload: fn(bool) -> Value,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let value = *rx.borrow_and_update();
            if out.send(payload(value).to_string()).is_err() {
                break;
            }
        }
    })
}

/// Start pushing readiness and copied changes, then send the first snapshot.
/// Receivers are taken before the snapshot is read, so a change landing in
/// between is still forwarded.
async fn start_feeds(
    state: &AppState,
    session: &Arc<ClientSession>,
    out: &WebSocketSend,
) -> [JoinHandle<()>; 2] {
    let readiness_rx = state.readiness.subscribe();
    let copied_rx = session.copied.subscribe();

    if let Err(e) = handlers::send_state(state, session, out).await {
        error!("Failed to send initial state: {}", e);
    }

    [
        forward_changes(readiness_rx, out.clone(), |ready| {
            json!({"type": "readiness", "ready": ready})
        }),
        forward_changes(copied_rx, out.clone(), |value| {
            json!({"type": "copied", "value": value})
        }),
    ]
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_uid = state.generate_client_uid();
    info!("New WebSocket connection: {}", client_uid);

    let session = Arc::new(ClientSession::new(client_uid.clone()));
    state
        .client_sessions
        .insert(client_uid.clone(), session.clone());

    let (mut sender, mut receiver) = socket.split();
    let (out, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if let Err(e) = sender.send(Message::Text(text)).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    let feeds = start_feeds(&state, &session, &out).await;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = handlers::handle_message(&state, &session, &text, &out).await {
                    error!("Error handling message: {}", e);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", client_uid);
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    for feed in feeds {
        feed.abort();
    }
    writer.abort();
    state.client_sessions.remove(&client_uid);

    info!("Cleaned up client {}", client_uid);
}
