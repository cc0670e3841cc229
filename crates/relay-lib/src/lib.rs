// ============================
// crates/relay-lib/src/lib.rs
// ============================
//! Core library for the WebRTC broadcast signaling relay.
//!
//! The relay brokers the offer/answer/candidate exchange between a
//! broadcaster and its viewers and tracks which streams are live. It never
//! carries media.

pub mod config;
pub mod error;
pub mod hub;
pub mod metrics;
pub mod presence;
pub mod registry;
pub mod signaling;
pub mod validation;
pub mod ws_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::hub::ClientHub;
use crate::registry::StreamRegistry;

/// Application state shared across all connections
pub struct AppState {
    /// Authoritative table of live streams and their viewers
    pub registry: StreamRegistry,
    /// Live connections, addressable by connection id
    pub hub: ClientHub,
    /// Settings manager
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state
    pub fn new(settings: Settings) -> Self {
        Self {
            registry: StreamRegistry::new(),
            hub: ClientHub::new(),
            settings: Arc::new(settings),
        }
    }
}
