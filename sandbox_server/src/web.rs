//! HTTP and WebSocket surface.
//!
//! - `GET /ws`: WebSocket upgrade, one session per socket.
//! - `GET /api/health`: liveness probe.
//! - anything else: static client files, falling back to `index.html`.

use std::path::PathBuf;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use sandbox_shared::net::{decode, ClientMsg, ConnId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::hub::{EventTx, HubEvent, OutboxRx};

/// Shared state for the axum handlers.
#[derive(Clone)]
struct AppState {
    events: EventTx,
    outbox_capacity: usize,
}

/// Health check body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Health {
    pub status: String,
    /// Milliseconds since the Unix epoch.
    pub time: i64,
}

/// Builds the router. `static_dir` of `None` disables file serving.
pub fn router(events: EventTx, outbox_capacity: usize, static_dir: Option<PathBuf>) -> Router {
    let state = AppState {
        events,
        outbox_capacity,
    };

    let mut app = Router::new()
        .route("/ws", get(ws_upgrade_handler))
        .route("/api/health", get(health))
        .with_state(state);

    if let Some(dir) = static_dir {
        let index_path = dir.join("index.html");
        let serve_dir = ServeDir::new(&dir).not_found_service(ServeFile::new(index_path));
        app = app.fallback_service(serve_dir);
        info!(dir = %dir.display(), "Serving static files");
    }

    app.layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        time: chrono::Utc::now().timestamp_millis(),
    })
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = ConnId::new_unique();
    info!(conn = %id, "WebSocket connected");

    let (mut ws_writer, mut ws_reader) = socket.split();
    let (outbox, mut outbox_rx): (_, OutboxRx) = mpsc::channel(state.outbox_capacity);

    if state
        .events
        .send(HubEvent::Connected {
            id: id.clone(),
            outbox,
        })
        .await
        .is_err()
    {
        debug!(conn = %id, "Hub gone, dropping connection");
        return;
    }

    // Writer: hub frames -> socket.
    let writer = tokio::spawn(async move {
        while let Some(text) = outbox_rx.recv().await {
            if ws_writer.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader: socket -> hub events.
    while let Some(frame) = ws_reader.next().await {
        match frame {
            Ok(Message::Text(text)) => match decode::<ClientMsg>(text.as_str()) {
                Ok(msg) => {
                    if state
                        .events
                        .send(HubEvent::Message { id: id.clone(), msg })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => debug!(conn = %id, error = %e, "Dropping malformed frame"),
            },
            Ok(Message::Close(_)) => break,
            // Pings are answered by axum; binary frames are not part of the protocol.
            Ok(_) => {}
            Err(e) => {
                debug!(conn = %id, error = %e, "WebSocket read error");
                break;
            }
        }
    }

    let _ = state.events.send(HubEvent::Disconnected { id: id.clone() }).await;
    writer.abort();
    info!(conn = %id, "WebSocket disconnected");
}
