//! The activity channel.
//!
//! One [`ActivityChannel`] owns at most one live connection. All connection
//! state lives in a driver task; the handle only queues commands and reads the
//! published [`ChannelState`]. Commands are processed in the order they were
//! issued.

use crate::backoff::{Backoff, RetryState};
use crate::dispatch::{ActivityHandler, Dispatcher, LogNotifier, Notifier};
use crate::transport::{Connector, Transport, TransportError, WsConnector};
use activity_relay_core::{ChannelState, ClientMessage, RelayEndpoint};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Reconnect,
    Send(ClientMessage),
}

/// Handle to a live activity channel.
///
/// None of the methods fail: connectivity problems show up in
/// [`state`](Self::state) and, once reconnecting gives up, through the
/// [`Notifier`]. Dropping the handle disconnects and stops the driver.
pub struct ActivityChannel {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ChannelState>,
    task: JoinHandle<()>,
}

impl ActivityChannel {
    /// Spawn a driver for `url`. Does not connect until [`connect`](Self::connect).
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C, H, N>(
        url: impl Into<String>,
        backoff: Backoff,
        connector: C,
        handler: H,
        notifier: N,
    ) -> Self
    where
        C: Connector,
        H: ActivityHandler,
        N: Notifier,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ChannelState::Disconnected);

        let driver = Driver {
            url: url.into(),
            connector: Arc::new(connector),
            retry: RetryState::new(backoff),
            link: Link::Idle,
            dispatcher: Dispatcher::new(handler),
            notifier,
            state: state_tx,
            commands: command_rx,
        };
        let task = tokio::spawn(driver.run());

        Self {
            commands,
            state,
            task,
        }
    }

    /// Connect to `endpoint` over WebSocket, logging terminal failure.
    pub fn open<H: ActivityHandler>(endpoint: &RelayEndpoint, backoff: Backoff, handler: H) -> Self {
        let channel = Self::spawn(endpoint.to_string(), backoff, WsConnector, handler, LogNotifier);
        channel.connect();
        channel
    }

    /// Open the connection. No-op while connecting or connected.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Unsubscribe, close, and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Disconnect, reset the retry budget and connect again.
    pub fn reconnect(&self) {
        self.command(Command::Reconnect);
    }

    /// Send a message if connected; otherwise drop it.
    pub fn send(&self, message: ClientMessage) {
        self.command(Command::Send(message));
    }

    /// Ask the relay to resend the activity list and stats.
    pub fn request_refresh(&self) {
        self.send(ClientMessage::RequestRefresh);
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribe to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Disconnect and wait for the driver to finish.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            tracing::warn!("Activity channel driver failed: {}", e);
        }
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Activity channel driver has stopped");
        }
    }
}

type Pending<T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send>>;

/// What the driver is currently waiting on.
enum Link<T> {
    Idle,
    Connecting(Pending<T>),
    Open(T),
    /// Reconnect timer. Dropping it cancels the reconnect.
    Waiting(Pin<Box<Sleep>>),
}

enum LinkEvent<T> {
    Opened(T),
    Frame(String),
    Lost(Option<TransportError>),
    RetryDue,
}

impl<T: Transport> Link<T> {
    fn state(&self) -> ChannelState {
        match self {
            Link::Idle | Link::Waiting(_) => ChannelState::Disconnected,
            Link::Connecting(_) => ChannelState::Connecting,
            Link::Open(_) => ChannelState::Connected,
        }
    }

    /// Cancel-safe: every variant keeps its progress in `self`.
    async fn next_event(&mut self) -> LinkEvent<T> {
        match self {
            Link::Idle => std::future::pending().await,
            Link::Connecting(pending) => match pending.await {
                Ok(transport) => LinkEvent::Opened(transport),
                Err(e) => LinkEvent::Lost(Some(e)),
            },
            Link::Open(transport) => match transport.recv().await {
                Some(Ok(frame)) => LinkEvent::Frame(frame),
                Some(Err(e)) => LinkEvent::Lost(Some(e)),
                None => LinkEvent::Lost(None),
            },
            Link::Waiting(timer) => {
                timer.as_mut().await;
                LinkEvent::RetryDue
            }
        }
    }
}

struct Driver<C: Connector, H, N> {
    url: String,
    connector: Arc<C>,
    retry: RetryState,
    link: Link<C::Transport>,
    dispatcher: Dispatcher<H>,
    notifier: N,
    state: watch::Sender<ChannelState>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<C, H, N> Driver<C, H, N>
where
    C: Connector,
    H: ActivityHandler,
    N: Notifier,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                event = self.link.next_event() => self.handle_event(event).await,
            }
        }

        self.disconnect().await;
        tracing::debug!(url = %self.url, "Activity channel driver stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.connect(),
            Command::Disconnect => self.disconnect().await,
            Command::Reconnect => {
                self.disconnect().await;
                self.connect();
            }
            Command::Send(message) => self.send(message).await,
        }
    }

    async fn handle_event(&mut self, event: LinkEvent<C::Transport>) {
        match event {
            LinkEvent::Opened(transport) => {
                tracing::info!(url = %self.url, "Connected to activity relay");
                self.link = Link::Open(transport);
                self.retry.reset();
                // subscribe before anyone can observe Connected
                self.send(ClientMessage::Subscribe).await;
                self.publish();
            }
            LinkEvent::Frame(frame) => {
                self.dispatcher.dispatch(&frame);
            }
            LinkEvent::Lost(Some(e)) => {
                tracing::warn!("Activity relay connection failed: {}", e);
                self.link_lost();
            }
            LinkEvent::Lost(None) => {
                tracing::info!("Activity relay closed the connection");
                self.link_lost();
            }
            LinkEvent::RetryDue => {
                self.retry.record_attempt();
                self.start_connecting();
            }
        }
    }

    fn connect(&mut self) {
        match self.link {
            Link::Connecting(_) | Link::Open(_) => {
                tracing::debug!("Already connecting or connected");
                return;
            }
            Link::Waiting(_) => tracing::debug!("Connecting now, cancelling pending reconnect"),
            Link::Idle => {}
        }
        self.start_connecting();
    }

    fn start_connecting(&mut self) {
        tracing::info!(
            url = %self.url,
            attempt = self.retry.attempts(),
            "Connecting to activity relay"
        );
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        self.link = Link::Connecting(Box::pin(async move { connector.connect(url).await }));
        self.publish();
    }

    async fn disconnect(&mut self) {
        match std::mem::replace(&mut self.link, Link::Idle) {
            Link::Open(mut transport) => {
                if let Some(frame) = encode(ClientMessage::Unsubscribe) {
                    if let Err(e) = transport.send(frame).await {
                        tracing::debug!("Could not unsubscribe: {}", e);
                    }
                }
                if let Err(e) = transport.close().await {
                    tracing::debug!("Error closing activity relay connection: {}", e);
                }
                tracing::info!(url = %self.url, "Disconnected from activity relay");
            }
            Link::Connecting(_) => tracing::debug!("Abandoned connection attempt"),
            Link::Waiting(_) => tracing::debug!("Cancelled pending reconnect"),
            Link::Idle => {}
        }
        self.retry.reset();
        self.publish();
    }

    async fn send(&mut self, message: ClientMessage) {
        let Link::Open(transport) = &mut self.link else {
            tracing::debug!(?message, "Not connected, dropping outbound message");
            return;
        };
        let Some(frame) = encode(message) else {
            return;
        };

        let result = transport.send(frame).await;
        if let Err(e) = result {
            tracing::warn!("Failed to send {:?}: {}", message, e);
            self.link_lost();
        }
    }

    /// The connection went away without a local disconnect.
    fn link_lost(&mut self) {
        self.link = Link::Idle;
        match self.retry.next_delay() {
            Some(delay) => {
                tracing::info!(
                    attempt = self.retry.attempts() + 1,
                    ceiling = self.retry.ceiling(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Scheduling activity relay reconnect"
                );
                self.link = Link::Waiting(Box::pin(tokio::time::sleep(delay)));
            }
            None => {
                tracing::warn!(
                    attempts = self.retry.attempts(),
                    "Activity relay reconnect attempts exhausted"
                );
                self.notifier.retries_exhausted(self.retry.attempts());
            }
        }
        self.publish();
    }

    fn publish(&self) {
        let state = self.link.state();
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!(from = ?*current, to = ?state, "Channel state changed");
            *current = state;
            true
        });
    }
}

fn encode(message: ClientMessage) -> Option<String> {
    match message.encode() {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!("Failed to encode {:?}: {}", message, e);
            None
        }
    }
}
