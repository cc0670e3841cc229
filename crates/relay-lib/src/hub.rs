// ============================
// crates/relay-lib/src/hub.rs
// ============================
//! Connection hub: live connections addressable by connection id.
//!
//! Each WebSocket connection registers an outbound channel under its uuid.
//! Delivery is fire-and-forget: failures are logged and never propagated,
//! and no registry lock is ever held across a send.

use dashmap::DashMap;
use relay_common::ServerMessage;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Map of connection id to that connection's outbound channel.
#[derive(Default)]
pub struct ClientHub {
    clients: DashMap<String, mpsc::Sender<ServerMessage>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound channel under its id.
    pub fn register(&self, conn_id: &str, tx: mpsc::Sender<ServerMessage>) {
        self.clients.insert(conn_id.to_string(), tx);
    }

    /// Drop a connection. Safe to call for an id that was never registered.
    pub fn unregister(&self, conn_id: &str) {
        self.clients.remove(conn_id);
    }

    pub fn contains(&self, conn_id: &str) -> bool {
        self.clients.contains_key(conn_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Send one message to one connection.
    ///
    /// Returns false when the target is not registered or its channel is
    /// closed; the caller decides whether that is worth reporting.
    pub async fn unicast(&self, conn_id: &str, msg: ServerMessage) -> bool {
        // Clone the sender out so no map shard is held across the await.
        let Some(tx) = self.clients.get(conn_id).map(|entry| entry.value().clone()) else {
            tracing::debug!(conn = conn_id, "unicast target not connected");
            return false;
        };

        if tx.send(msg).await.is_err() {
            tracing::warn!(conn = conn_id, "unicast to closing connection dropped");
            return false;
        }
        true
    }

    /// Send one message to every connection.
    pub async fn broadcast(&self, msg: ServerMessage) {
        self.fan_out(None, msg).await;
    }

    /// Send one message to every connection except `skip_id`.
    pub async fn broadcast_except(&self, skip_id: &str, msg: ServerMessage) {
        self.fan_out(Some(skip_id), msg).await;
    }

    async fn fan_out(&self, skip_id: Option<&str>, msg: ServerMessage) {
        let targets: Vec<(String, mpsc::Sender<ServerMessage>)> = self
            .clients
            .iter()
            .filter(|entry| skip_id != Some(entry.key().as_str()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut sends = JoinSet::new();
        for (conn_id, tx) in targets {
            let msg = msg.clone();
            sends.spawn(async move { tx.send(msg).await.map_err(|_| conn_id) });
        }

        let mut failed = 0;
        while let Some(result) = sends.join_next().await {
            match result {
                Ok(Ok(())) => {},
                Ok(Err(_)) | Err(_) => failed += 1,
            }
        }

        if failed > 0 {
            tracing::warn!(failed, "some clients missed a broadcast");
        }
    }
}
