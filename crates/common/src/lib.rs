// ================
// crates/common/src/lib.rs
// ================
//! Wire protocol shared between the relay server and browser clients.
//!
//! Messages travel as JSON text frames tagged with a `type` field. Tag values
//! are kebab-case and payload fields are camelCase, matching what the web
//! client sends over the socket.

use serde::{Deserialize, Serialize};

/// Presentation data a broadcaster attaches to its stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StreamMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

/// One SDP half of the offer/answer handshake.
///
/// Fields default to empty rather than failing deserialization so that an
/// incomplete description can be rejected with a named error instead of a
/// parse failure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(default)]
    pub sdp: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Public projection of one active stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    pub stream_id: String,
    pub viewer_count: usize,
    #[serde(flatten)]
    pub meta: Option<StreamMeta>,
}

/// Messages sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Advertise a new broadcast owned by this connection.
    StartBroadcast {
        #[serde(default)]
        meta: Option<StreamMeta>,
    },
    /// Tear down this connection's broadcast.
    StopBroadcast,
    /// Attach to a stream and ask its broadcaster for an offer.
    RequestOffer { stream_id: String },
    /// Broadcaster forwards an offer to one of its viewers.
    Offer {
        offer: SessionDescription,
        stream_id: String,
        viewer_socket_id: String,
    },
    /// Viewer returns its answer to the broadcaster.
    Answer {
        answer: SessionDescription,
        stream_id: String,
    },
    /// Relay a network-path candidate to the other side of a handshake.
    IceCandidate {
        candidate: serde_json::Value,
        #[serde(default)]
        stream_id: Option<String>,
        #[serde(default)]
        target_socket_id: Option<String>,
    },
    /// Ask for the current stream listing without waiting for a push.
    GetActiveStreams,
}

/// Messages sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Full listing of live streams, pushed on connect and on every change.
    ActiveStreams { streams: Vec<StreamSummary> },
    /// Tells a broadcaster to produce an offer for the named viewer.
    SendOffer { viewer_socket_id: String },
    /// Offer relayed to a viewer.
    Offer {
        offer: SessionDescription,
        stream_id: String,
    },
    /// Answer relayed to a broadcaster, tagged with the answering viewer.
    Answer {
        answer: SessionDescription,
        stream_id: String,
        viewer_socket_id: String,
    },
    /// Candidate relayed to the resolved target.
    IceCandidate {
        candidate: serde_json::Value,
        #[serde(default)]
        stream_id: Option<String>,
        sender_socket_id: String,
    },
    ViewerJoined {
        viewer_socket_id: String,
        viewer_count: usize,
    },
    ViewerLeft {
        viewer_socket_id: String,
        viewer_count: usize,
    },
    /// The stream this viewer was attached to is gone.
    BroadcastEnded { stream_id: String },
    Error { code: String, message: String },
}
