//! Relay server implementation.

use crate::generator::ActivityLog;
use activity_relay_core::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::tungstenite::Message;

type SharedLog = Arc<RwLock<ActivityLog>>;

pub async fn run(addr: SocketAddr, interval: Duration) -> anyhow::Result<()> {
    let log = Arc::new(RwLock::new(ActivityLog::seeded(5)));
    let (broadcast_tx, _) = broadcast::channel::<String>(100);

    // Spawn activity generator
    let tick_log = log.clone();
    let tick_broadcast = broadcast_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        interval.tick().await;
        let mut ticks: u64 = 0;
        loop {
            interval.tick().await;
            ticks += 1;
            let mut frames = Vec::new();
            {
                let mut log = tick_log.write().await;
                frames.push(ServerMessage::NewActivity(log.record_next()));
                if ticks % 3 == 0 {
                    if let Some(record) = log.amend_oldest() {
                        frames.push(ServerMessage::ActivityUpdated(record));
                    }
                }
                frames.push(ServerMessage::ActivityStats(log.stats()));
            }
            for frame in frames {
                match frame.encode() {
                    Ok(text) => {
                        let _ = tick_broadcast.send(text);
                    }
                    Err(e) => tracing::warn!("Failed to encode frame: {}", e),
                }
            }
        }
    });

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}", addr);

    loop {
        let (stream, client_addr) = listener.accept().await?;
        let log = log.clone();
        let broadcast_tx = broadcast_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, log, broadcast_tx).await {
                tracing::warn!("Connection error from {}: {}", client_addr, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    log: SharedLog,
    broadcast_tx: broadcast::Sender<String>,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    tracing::debug!("New connection from {}", addr);

    let mut broadcast_rx = broadcast_tx.subscribe();
    let mut subscribed = false;

    loop {
        tokio::select! {
            // Incoming message from the dashboard
            msg = stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                let text = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };

                let request: ClientMessage = match serde_json::from_str(&text) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!("Invalid message from {}: {}", addr, e);
                        continue;
                    }
                };

                match request {
                    ClientMessage::Subscribe => {
                        tracing::info!("{} subscribed", addr);
                        subscribed = true;
                        send_snapshot(&log, &mut sink).await?;
                    }
                    ClientMessage::RequestRefresh => {
                        tracing::debug!("{} requested a refresh", addr);
                        send_snapshot(&log, &mut sink).await?;
                    }
                    ClientMessage::Unsubscribe => {
                        tracing::info!("{} unsubscribed", addr);
                        subscribed = false;
                    }
                }
            }

            // Activity from the generator
            frame = broadcast_rx.recv() => {
                match frame {
                    Ok(frame) if subscribed => {
                        sink.send(Message::Text(frame.into())).await?;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("{} lagged, skipped {} frames", addr, missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("Connection closed: {}", addr);
    Ok(())
}

async fn send_snapshot(
    log: &SharedLog,
    sink: &mut futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<TcpStream>,
        Message,
    >,
) -> anyhow::Result<()> {
    let (initial, stats) = {
        let log = log.read().await;
        (
            ServerMessage::InitialActivities(log.recent()),
            ServerMessage::ActivityStats(log.stats()),
        )
    };
    sink.send(Message::Text(initial.encode()?.into())).await?;
    sink.send(Message::Text(stats.encode()?.into())).await?;
    Ok(())
}
