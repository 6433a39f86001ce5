//! WebSocket upgrade endpoints.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::ws::ConnectionManager;
use domain::events::{ride_channel, DASHBOARD_CHANNEL};

/// GET /ws/dashboard
pub async fn ws_dashboard(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let manager = state.ws.clone();
    ws.on_upgrade(move |socket| {
        handle_socket(socket, manager, vec![DASHBOARD_CHANNEL.to_string()])
    })
}

/// GET /ws/rides/{ride_id}
pub async fn ws_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    let manager = state.ws.clone();
    let channels = vec![ride_channel(ride_id), DASHBOARD_CHANNEL.to_string()];
    ws.on_upgrade(move |socket| handle_socket(socket, manager, channels))
}

async fn handle_socket(
    mut socket: WebSocket,
    manager: Arc<ConnectionManager>,
    channels: Vec<String>,
) {
    let (id, mut rx) = manager.subscribe(&channels).await;
    let total = manager.active_connections().await;
    info!(
        subscriber = id,
        channels = ?channels,
        total = total,
        "WebSocket client connected"
    );

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(payload) => {
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) if text == "ping" => {
                        if socket
                            .send(Message::Text(r#"{"type":"pong"}"#.to_string()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    manager.unsubscribe_all(id).await;
    info!(subscriber = id, "WebSocket client disconnected");
}
