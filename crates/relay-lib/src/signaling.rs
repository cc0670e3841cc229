// ============================
// crates/relay-lib/src/signaling.rs
// ============================
//! Signaling event router.
//!
//! One `SignalingHandler` is instantiated per connection and routes that
//! connection's inbound events: registering broadcasts, attaching viewers,
//! and relaying the offer/answer/candidate handshake to its target. Handlers
//! mutate the registry through its atomic operations and emit outbound
//! messages only after the mutation is complete, so no lock is ever held
//! across a send.
//!
//! Errors never cross a connection boundary: a bad message is reported back
//! to its sender and everyone else is untouched.

use std::sync::Arc;

use metrics::{counter, gauge};
use relay_common::{ClientMessage, ServerMessage, SessionDescription, StreamMeta};
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::{metrics as keys, presence, validation, AppState};

/// Signaling handler for processing one connection's messages
pub struct SignalingHandler {
    state: Arc<AppState>,
    conn_id: String,
}

impl SignalingHandler {
    pub fn new(state: Arc<AppState>, conn_id: String) -> Self {
        Self { state, conn_id }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// Register this connection and push it an immediate stream listing.
    pub async fn on_connect(&self, tx: mpsc::Sender<ServerMessage>) {
        self.state.hub.register(&self.conn_id, tx);
        counter!(keys::WS_CONNECTION).increment(1);
        gauge!(keys::WS_ACTIVE).increment(1.0);
        tracing::info!(conn = %self.conn_id, "new client connected");

        presence::greet(&self.state, &self.conn_id).await;
    }

    /// Route one inbound message.
    ///
    /// # Errors
    /// Returns the error to report back to this connection; the caller
    /// forwards it via [`SignalingHandler::report`]. No error here affects
    /// any other connection.
    pub async fn handle_message(&self, msg: ClientMessage) -> Result<(), AppError> {
        match msg {
            ClientMessage::StartBroadcast { meta } => self.start_broadcast(meta).await,
            ClientMessage::StopBroadcast => self.stop_broadcast().await,
            ClientMessage::RequestOffer { stream_id } => self.request_offer(&stream_id).await,
            ClientMessage::Offer {
                offer,
                stream_id,
                viewer_socket_id,
            } => self.relay_offer(offer, stream_id, &viewer_socket_id).await,
            ClientMessage::Answer { answer, stream_id } => {
                self.relay_answer(answer, stream_id).await
            },
            ClientMessage::IceCandidate {
                candidate,
                stream_id,
                target_socket_id,
            } => {
                self.relay_candidate(candidate, stream_id, target_socket_id)
                    .await
            },
            ClientMessage::GetActiveStreams => {
                presence::greet(&self.state, &self.conn_id).await;
                Ok(())
            },
        }
    }

    /// Report a handler error back to this connection as an `error` event.
    pub async fn report(&self, err: &AppError) {
        if matches!(err, AppError::MalformedPayload(_) | AppError::Json(_)) {
            counter!(keys::PAYLOAD_MALFORMED).increment(1);
        }
        tracing::warn!(conn = %self.conn_id, code = err.error_code(), %err, "rejected client message");

        self.state
            .hub
            .unicast(
                &self.conn_id,
                ServerMessage::Error {
                    code: err.error_code().to_string(),
                    message: err.client_message(),
                },
            )
            .await;
    }

    async fn start_broadcast(&self, meta: Option<StreamMeta>) -> Result<(), AppError> {
        let created = self.state.registry.create_stream(&self.conn_id, meta);

        // Viewers displaced by an overwrite lost their stream
        for viewer in &created.displaced_viewers {
            self.state
                .hub
                .unicast(
                    viewer,
                    ServerMessage::BroadcastEnded {
                        stream_id: self.conn_id.clone(),
                    },
                )
                .await;
        }

        // If this connection had been watching another stream, tell its owner
        if let Some(left) = created.detached_from {
            self.state
                .hub
                .unicast(
                    &left.stream_id,
                    ServerMessage::ViewerLeft {
                        viewer_socket_id: self.conn_id.clone(),
                        viewer_count: left.viewer_count,
                    },
                )
                .await;
        }

        counter!(keys::BROADCAST_STARTED).increment(1);
        tracing::info!(stream = %self.conn_id, "broadcast started");

        presence::broadcast_snapshot(&self.state).await;
        Ok(())
    }

    async fn stop_broadcast(&self) -> Result<(), AppError> {
        // Stopping without a stream is a no-op, not an error
        let Some(stream) = self.state.registry.remove_stream(&self.conn_id) else {
            return Ok(());
        };

        for viewer in &stream.viewers {
            self.state
                .hub
                .unicast(
                    viewer,
                    ServerMessage::BroadcastEnded {
                        stream_id: self.conn_id.clone(),
                    },
                )
                .await;
        }

        counter!(keys::BROADCAST_STOPPED).increment(1);
        tracing::info!(stream = %self.conn_id, "broadcast stopped");

        presence::broadcast_snapshot(&self.state).await;
        Ok(())
    }

    async fn request_offer(&self, stream_id: &str) -> Result<(), AppError> {
        validation::validate_stream_id(stream_id)?;

        let added = self.state.registry.add_viewer(stream_id, &self.conn_id)?;

        // Ask the broadcaster to open a handshake with this viewer
        self.state
            .hub
            .unicast(
                stream_id,
                ServerMessage::SendOffer {
                    viewer_socket_id: self.conn_id.clone(),
                },
            )
            .await;
        self.state
            .hub
            .unicast(
                stream_id,
                ServerMessage::ViewerJoined {
                    viewer_socket_id: self.conn_id.clone(),
                    viewer_count: added.viewer_count,
                },
            )
            .await;

        if let Some(left) = added.moved_from {
            self.state
                .hub
                .unicast(
                    &left.stream_id,
                    ServerMessage::ViewerLeft {
                        viewer_socket_id: self.conn_id.clone(),
                        viewer_count: left.viewer_count,
                    },
                )
                .await;
        }

        counter!(keys::VIEWER_JOINED).increment(1);

        // A repeated request leaves the listing untouched
        if added.newly_attached {
            presence::broadcast_snapshot(&self.state).await;
        }
        Ok(())
    }

    async fn relay_offer(
        &self,
        offer: SessionDescription,
        stream_id: String,
        viewer_socket_id: &str,
    ) -> Result<(), AppError> {
        validation::validate_session_description(&offer, "offer")?;

        let delivered = self
            .state
            .hub
            .unicast(viewer_socket_id, ServerMessage::Offer { offer, stream_id })
            .await;
        if !delivered {
            return Err(AppError::UnknownTarget);
        }

        counter!(keys::SIGNAL_RELAYED).increment(1);
        Ok(())
    }

    async fn relay_answer(
        &self,
        answer: SessionDescription,
        stream_id: String,
    ) -> Result<(), AppError> {
        validation::validate_session_description(&answer, "answer")?;

        if !self.state.registry.contains_stream(&stream_id) {
            return Err(AppError::StreamNotFound(stream_id));
        }

        // The owner's connection id is the stream id
        let owner_id = stream_id.clone();
        self.state
            .hub
            .unicast(
                &owner_id,
                ServerMessage::Answer {
                    answer,
                    stream_id,
                    viewer_socket_id: self.conn_id.clone(),
                },
            )
            .await;

        counter!(keys::SIGNAL_RELAYED).increment(1);
        Ok(())
    }

    /// Candidates are delivered only to an explicitly resolvable party:
    /// the named target, else the stream's owner. There is no broadcast
    /// fallback; an unresolvable candidate is dropped and reported.
    async fn relay_candidate(
        &self,
        candidate: serde_json::Value,
        stream_id: Option<String>,
        target_socket_id: Option<String>,
    ) -> Result<(), AppError> {
        let target = match target_socket_id {
            Some(target) => target,
            None => match &stream_id {
                Some(id) if self.state.registry.contains_stream(id) => id.clone(),
                _ => return Err(AppError::UnknownTarget),
            },
        };

        let delivered = self
            .state
            .hub
            .unicast(
                &target,
                ServerMessage::IceCandidate {
                    candidate,
                    stream_id,
                    sender_socket_id: self.conn_id.clone(),
                },
            )
            .await;
        if !delivered {
            return Err(AppError::UnknownTarget);
        }

        counter!(keys::SIGNAL_RELAYED).increment(1);
        Ok(())
    }

    /// Tear down everything this connection owned or was attached to.
    ///
    /// The ownership check runs before the viewer check: a connection id is
    /// structurally both a stream key and a potential viewer-set member, and
    /// owner-first ordering resolves that ambiguity. Safe against duplicate
    /// delivery; a second call finds nothing to remove.
    pub async fn on_disconnect(&self) {
        self.state.hub.unregister(&self.conn_id);
        counter!(keys::WS_DISCONNECTION).increment(1);
        gauge!(keys::WS_ACTIVE).decrement(1.0);
        tracing::info!(conn = %self.conn_id, "client disconnected");

        if let Some(stream) = self.state.registry.remove_stream(&self.conn_id) {
            for viewer in &stream.viewers {
                self.state
                    .hub
                    .unicast(
                        viewer,
                        ServerMessage::BroadcastEnded {
                            stream_id: self.conn_id.clone(),
                        },
                    )
                    .await;
            }
            counter!(keys::BROADCAST_STOPPED).increment(1);
            presence::broadcast_snapshot(&self.state).await;
        } else if let Some(left) = self.state.registry.remove_viewer(&self.conn_id) {
            self.state
                .hub
                .unicast(
                    &left.stream_id,
                    ServerMessage::ViewerLeft {
                        viewer_socket_id: self.conn_id.clone(),
                        viewer_count: left.viewer_count,
                    },
                )
                .await;
            counter!(keys::VIEWER_LEFT).increment(1);
            presence::broadcast_snapshot(&self.state).await;
        }
    }
}
