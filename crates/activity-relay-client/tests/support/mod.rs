//! In-memory relay for driving an `ActivityChannel` without a socket.

#![allow(dead_code)]

use activity_relay_client::{
    ActivityPayload, Connector, EventKind, Transport, TransportError,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const SUBSCRIBE: &str = r#"{"type":"SUBSCRIBE_ACTIVITIES"}"#;
pub const UNSUBSCRIBE: &str = r#"{"type":"UNSUBSCRIBE_ACTIVITIES"}"#;
pub const REFRESH: &str = r#"{"type":"REQUEST_REFRESH"}"#;

/// What the next connection attempt does. Attempts past the end of the
/// script are refused.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Accept,
    Refuse,
    /// Never completes.
    Hang,
}

/// Something the client did to an accepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Written {
    Frame(String),
    Closed,
}

impl Written {
    pub fn frame(text: &str) -> Self {
        Written::Frame(text.to_string())
    }
}

pub struct ScriptedConnector {
    outcomes: Mutex<VecDeque<Outcome>>,
    attempts: mpsc::UnboundedSender<Instant>,
    peers: mpsc::UnboundedSender<Peer>,
}

/// Test-side view of a [`ScriptedConnector`].
pub struct Remote {
    /// When each connection attempt started.
    pub attempts: mpsc::UnboundedReceiver<Instant>,
    /// Server ends of accepted connections.
    pub peers: mpsc::UnboundedReceiver<Peer>,
}

impl Remote {
    pub fn drain_attempts(&mut self) -> Vec<Instant> {
        let mut attempts = Vec::new();
        while let Ok(at) = self.attempts.try_recv() {
            attempts.push(at);
        }
        attempts
    }
}

pub fn scripted(outcomes: impl IntoIterator<Item = Outcome>) -> (ScriptedConnector, Remote) {
    let (attempts_tx, attempts) = mpsc::unbounded_channel();
    let (peers_tx, peers) = mpsc::unbounded_channel();
    let connector = ScriptedConnector {
        outcomes: Mutex::new(outcomes.into_iter().collect()),
        attempts: attempts_tx,
        peers: peers_tx,
    };
    (connector, Remote { attempts, peers })
}

impl Connector for ScriptedConnector {
    type Transport = MemoryTransport;

    async fn connect(&self, _url: String) -> Result<MemoryTransport, TransportError> {
        let _ = self.attempts.send(Instant::now());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Refuse);

        match outcome {
            Outcome::Refuse => Err(TransportError::Other("connection refused".into())),
            Outcome::Hang => std::future::pending().await,
            Outcome::Accept => {
                let (to_client, inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                let _ = self.peers.send(Peer {
                    to_client,
                    from_client,
                });
                Ok(MemoryTransport { inbound, outbound })
            }
        }
    }
}

pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<Written>,
}

impl Transport for MemoryTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outbound
            .send(Written::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let _ = self.outbound.send(Written::Closed);
        self.inbound.close();
        Ok(())
    }
}

/// Server end of an accepted connection. Dropping it closes the connection
/// abruptly.
pub struct Peer {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<Written>,
}

impl Peer {
    pub fn push(&self, frame: &str) {
        self.to_client.send(frame.to_string()).unwrap();
    }

    pub async fn next_written(&mut self) -> Option<Written> {
        self.from_client.recv().await
    }

    /// Stop accepting frames from the client while keeping the read side
    /// open, so the client's next write fails.
    pub fn stop_reading(&mut self) {
        self.from_client.close();
    }

    /// Everything written so far.
    pub fn drain(&mut self) -> Vec<Written> {
        let mut written = Vec::new();
        while let Ok(w) = self.from_client.try_recv() {
            written.push(w);
        }
        written
    }
}

pub type Events = mpsc::UnboundedReceiver<(ActivityPayload, EventKind)>;

pub fn recording_handler() -> (
    impl FnMut(ActivityPayload, EventKind) + Send + 'static,
    Events,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |payload: ActivityPayload, kind: EventKind| {
        let _ = tx.send((payload, kind));
    };
    (handler, rx)
}

pub fn recording_notifier() -> (
    impl FnMut(u32) + Send + 'static,
    mpsc::UnboundedReceiver<u32>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let notifier = move |attempts: u32| {
        let _ = tx.send(attempts);
    };
    (notifier, rx)
}

/// Timer deadlines land on millisecond ticks; allow for that.
pub fn assert_delay(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected a delay of {expected:?}, got {actual:?}"
    );
}
