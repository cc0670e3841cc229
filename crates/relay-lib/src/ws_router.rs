// ============================
// crates/relay-lib/src/ws_router.rs
// ============================
//! WebSocket router and connection handling.
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use relay_common::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppError;
use crate::signaling::SignalingHandler;
use crate::AppState;

/// Outbound messages buffered per connection before backpressure kicks in
const OUTBOUND_CHANNEL_CAPACITY: usize = 32;

/// Create the WebSocket router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Liveness probe
async fn healthz() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Handler for WebSocket connections
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    // The connection id doubles as the stream id if this client broadcasts
    let conn_id = Uuid::new_v4().to_string();

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CHANNEL_CAPACITY);

    // Forward outbound messages to the socket as JSON text frames
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(%err, "failed to serialize outbound message");
                    continue;
                },
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let handler = SignalingHandler::new(state, conn_id);
    handler.on_connect(tx).await;

    // Process inbound frames until the client goes away
    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if let Err(err) = handler.handle_message(msg).await {
                        handler.report(&err).await;
                    }
                },
                Err(err) => handler.report(&AppError::Json(err)).await,
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    // The transport delivering a close (or erroring) is the sole cleanup
    // trigger; everything this connection owned goes with it.
    handler.on_disconnect().await;
    send_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_healthz_responds_ok() {
        let state = Arc::new(AppState::new(Settings::default()));
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let state = Arc::new(AppState::new(Settings::default()));
        let app = create_router(state);

        // A plain GET without the upgrade handshake is rejected
        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::OK);
    }
}
