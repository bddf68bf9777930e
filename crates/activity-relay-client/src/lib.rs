//! Client for the activity relay.
//!
//! An [`ActivityChannel`] keeps one duplex connection to the relay open,
//! subscribes on every successful open, hands inbound events to an
//! [`ActivityHandler`], and reconnects with exponential backoff until the
//! retry ceiling is reached.

mod backoff;
mod channel;
mod config;
mod dispatch;
mod feed;
mod transport;

pub use backoff::{Backoff, DEFAULT_BASE_DELAY, DEFAULT_CEILING, RetryState};
pub use channel::ActivityChannel;
pub use config::{ConfigError, ReconnectConfig, RelayConfig};
pub use dispatch::{ActivityHandler, Dispatcher, LogNotifier, Notifier};
pub use feed::{ActivityFeed, DEFAULT_FEED_CAPACITY};
pub use transport::{Connector, Transport, TransportError, WsConnector, WsTransport};

pub use activity_relay_core::{
    ActivityAction, ActivityPayload, ActivityRecord, ActivityStats, ChannelState, ClientMessage,
    EventKind, RelayEndpoint, ServerMessage,
};
