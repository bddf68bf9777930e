//! Core types for the activity relay.
//!
//! This crate provides the wire vocabulary spoken between a dashboard and the
//! backend's activity relay, plus the records that travel over it. The client
//! crate provides the connection lifecycle.

mod activity;
mod endpoint;
mod message;

pub use activity::{ActivityAction, ActivityPayload, ActivityRecord, ActivityStats, EventKind};
pub use endpoint::{DEFAULT_RELAY_PATH, EndpointError, RelayEndpoint};
pub use message::{ClientMessage, DecodeError, ServerMessage};

/// Connectivity of a relay channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No channel is open. Either never connected, locally disconnected,
    /// waiting for a reconnect timer, or given up.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Channel open and subscribed.
    Connected,
}

impl ChannelState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ChannelState::Connected)
    }
}
