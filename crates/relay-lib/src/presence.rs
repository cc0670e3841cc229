// ============================
// crates/relay-lib/src/presence.rs
// ============================
//! Presence notifier: pushes the public stream listing to clients.
//!
//! Callers invoke [`broadcast_snapshot`] only after a mutation that changed
//! the externally visible shape of the registry; no-op events must not
//! trigger a push.

use relay_common::ServerMessage;

use crate::AppState;

/// Push the current listing to every connection.
pub async fn broadcast_snapshot(state: &AppState) {
    let streams = state.registry.snapshot();
    tracing::debug!(streams = streams.len(), "pushing stream listing");
    state.hub.broadcast(ServerMessage::ActiveStreams { streams }).await;
}

/// Push the current listing to a single, typically just-connected, client
/// so it never has to wait for someone else's action to learn the state.
pub async fn greet(state: &AppState, conn_id: &str) {
    let streams = state.registry.snapshot();
    state
        .hub
        .unicast(conn_id, ServerMessage::ActiveStreams { streams })
        .await;
}
