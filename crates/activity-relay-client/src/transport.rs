//! Duplex text transport.
//!
//! The channel driver only needs to open a connection, write text frames,
//! read text frames and close. [`WsConnector`] provides that over WebSocket;
//! tests substitute an in-memory implementation.

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Opens transports to a URL.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    fn connect(
        &self,
        url: String,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

/// An open duplex connection carrying text frames.
pub trait Transport: Send + 'static {
    /// Write one text frame.
    fn send(&mut self, frame: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next inbound text frame. `None` once the peer has closed.
    ///
    /// Must be cancel-safe: the driver polls it inside `select!`.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, TransportError>>> + Send;

    /// Close the connection from this side.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Transport failure.
///
/// Custom [`Transport`] and [`Connector`] implementations report through
/// `Closed` and `Other`; tungstenite's closed-socket errors also map to
/// `Closed`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(tokio_tungstenite::tungstenite::Error),
    /// The connection is already gone.
    #[error("connection closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match e {
            Error::ConnectionClosed | Error::AlreadyClosed => TransportError::Closed,
            e => TransportError::WebSocket(e),
        }
    }
}

/// Connects over WebSocket (plain or TLS, as the URL scheme says).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: String) -> Result<WsTransport, TransportError> {
        let (ws, response) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(WsTransport { ws })
    }
}

/// A WebSocket connection opened by [`WsConnector`].
pub struct WsTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.ws.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let msg = match self.ws.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(e.into())),
            };
            match msg {
                Message::Text(text) => return Some(Ok(text.as_str().to_owned())),
                Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::debug!(len = data.len(), "Ignoring non-UTF-8 binary frame"),
                },
                Message::Close(frame) => {
                    tracing::debug!(?frame, "Peer closed the connection");
                    return None;
                }
                // pings are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.ws.close(None).await.map_err(TransportError::from) {
            Ok(()) | Err(TransportError::Closed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
