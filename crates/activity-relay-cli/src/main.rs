//! `activity-relay`: watch the live activity feed from a terminal.
//!
//!   activity-relay --page-url https://crm.example.com watch
//!   activity-relay --config relay.toml watch --json --refresh-every 60
//!   activity-relay --page-url http://localhost:3000 endpoint

use activity_relay_client::{
    ActivityChannel, ActivityFeed, ActivityPayload, EventKind, RelayConfig,
};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, Interval};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "activity-relay",
    version,
    about = "Watch the live activity feed of the agency back office"
)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// TOML config file
    #[arg(long, global = true, value_name = "PATH", env = "ACTIVITY_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Dashboard page URL; overrides `page_url` from the config file
    #[arg(long, global = true, value_name = "URL", env = "ACTIVITY_RELAY_PAGE_URL")]
    page_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream activity events until interrupted
    Watch {
        /// Print one JSON object per event
        #[arg(long)]
        json: bool,

        /// Ask the relay to resend activities and stats every SECS seconds
        #[arg(long, value_name = "SECS")]
        refresh_every: Option<u64>,
    },
    /// Print the relay URL derived from the page URL
    Endpoint,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("activity_relay=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.source)?;

    match cli.command {
        Command::Watch {
            json,
            refresh_every,
        } => watch(config, json, refresh_every).await,
        Command::Endpoint => {
            println!("{}", config.endpoint()?);
            Ok(())
        }
    }
}

fn load_config(source: &SourceArgs) -> anyhow::Result<RelayConfig> {
    let mut config = match &source.config {
        Some(path) => RelayConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RelayConfig::default(),
    };
    if let Some(page_url) = &source.page_url {
        config.page_url = page_url.clone();
    }
    Ok(config)
}

async fn watch(config: RelayConfig, json: bool, refresh_every: Option<u64>) -> anyhow::Result<()> {
    let endpoint = config.endpoint()?;
    let feed = Arc::new(Mutex::new(ActivityFeed::new(config.feed_capacity)));

    let handler_feed = Arc::clone(&feed);
    let handler = move |payload: ActivityPayload, kind: EventKind| {
        print_event(&payload, kind, json);
        match handler_feed.lock() {
            Ok(mut feed) => feed.apply(payload, kind),
            Err(_) => tracing::warn!("Feed lock poisoned, event not recorded"),
        }
    };

    let channel = ActivityChannel::open(&endpoint, config.backoff(), handler);
    tracing::info!(%endpoint, "Watching activity relay, Ctrl-C to stop");

    let mut refresh = refresh_every.filter(|secs| *secs > 0).map(|secs| {
        let period = Duration::from_secs(secs);
        tokio::time::interval_at(Instant::now() + period, period)
    });

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl-C")?;
                break;
            }
            _ = tick(&mut refresh) => {
                tracing::debug!("Requesting refresh");
                channel.request_refresh();
            }
        }
    }

    channel.shutdown().await;

    let feed = feed
        .lock()
        .map_err(|_| anyhow::anyhow!("feed lock poisoned"))?;
    eprintln!(
        "{} recent activities, {} new while watching",
        feed.len(),
        feed.unseen()
    );
    if let Some(stats) = feed.stats() {
        eprintln!("total {} / today {}", stats.total, stats.today);
    }
    Ok(())
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn print_event(payload: &ActivityPayload, kind: EventKind, json: bool) {
    if json {
        let line = serde_json::json!({ "kind": kind.as_str(), "data": payload });
        println!("{line}");
        return;
    }

    match payload {
        ActivityPayload::Activity(record) => println!("[{kind}] {}", record.summary()),
        ActivityPayload::Activities(records) => {
            println!("[{kind}] {} recent activities", records.len());
            for record in records {
                println!("    {}", record.summary());
            }
        }
        ActivityPayload::Stats(stats) => {
            println!("[{kind}] total {} / today {}", stats.total, stats.today)
        }
    }
}
