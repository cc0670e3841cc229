// ==============
// crates/relay-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_DISCONNECTION: &str = "ws.disconnection";
pub const WS_ACTIVE: &str = "ws.active";
pub const BROADCAST_STARTED: &str = "broadcast.started";
pub const BROADCAST_STOPPED: &str = "broadcast.stopped";
pub const VIEWER_JOINED: &str = "viewer.joined";
pub const VIEWER_LEFT: &str = "viewer.left";
pub const SIGNAL_RELAYED: &str = "signal.relayed";
pub const PAYLOAD_MALFORMED: &str = "payload.malformed";
