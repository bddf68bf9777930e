//! Inbound frame classification and consumer callbacks.

use activity_relay_core::{ActivityPayload, EventKind, ServerMessage};

/// Receives every recognized inbound event.
pub trait ActivityHandler: Send + 'static {
    fn on_event(&mut self, payload: ActivityPayload, kind: EventKind);
}

impl<F> ActivityHandler for F
where
    F: FnMut(ActivityPayload, EventKind) + Send + 'static,
{
    fn on_event(&mut self, payload: ActivityPayload, kind: EventKind) {
        self(payload, kind)
    }
}

/// Told once when automatic reconnection gives up.
pub trait Notifier: Send + 'static {
    fn retries_exhausted(&mut self, attempts: u32);
}

impl<F> Notifier for F
where
    F: FnMut(u32) + Send + 'static,
{
    fn retries_exhausted(&mut self, attempts: u32) {
        self(attempts)
    }
}

/// Default notifier: an error-level log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn retries_exhausted(&mut self, attempts: u32) {
        tracing::error!(
            attempts,
            "live activity updates unavailable, giving up on reconnecting"
        );
    }
}

/// Turns text frames into handler calls.
///
/// Malformed frames and unknown discriminants are logged and dropped; neither
/// reaches the handler.
pub struct Dispatcher<H> {
    handler: H,
}

impl<H: ActivityHandler> Dispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Handle one inbound frame. Returns the kind delivered, if any.
    pub fn dispatch(&mut self, frame: &str) -> Option<EventKind> {
        let message = match ServerMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping malformed frame: {}", e);
                return None;
            }
        };

        if let ServerMessage::Unknown { kind } = &message {
            tracing::warn!(kind = %kind, "Dropping frame with unknown type");
            return None;
        }

        let (payload, kind) = message.into_event()?;
        tracing::debug!(kind = %kind, "Dispatching activity event");
        self.handler.on_event(payload, kind);
        Some(kind)
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}
