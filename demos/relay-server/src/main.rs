//! Demo activity relay.
//!
//! Speaks the relay protocol with synthetic back-office activity so the
//! client and CLI can be exercised locally:
//!   cargo run -p activity-relay-demo-server -- --port 3000 --interval-ms 2000
//!   cargo run -p activity-relay-cli -- --page-url http://localhost:3000 watch

mod generator;
mod server;

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("relay_server=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port: u16 = parse_arg(&args, "--port").unwrap_or(3000);
    let interval_ms: u64 = parse_arg(&args, "--interval-ms").unwrap_or(2000);

    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    tracing::info!("Emitting an activity every {}ms", interval_ms);

    server::run(addr, Duration::from_millis(interval_ms)).await
}

fn parse_arg<T: FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
