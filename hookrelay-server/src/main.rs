//! hookrelay server
//!
//! Receives webhooks from Git hosts, Netlify, RSS push services and generic
//! senders, polls RSS/Atom feeds, and relays every event to Telegram, email
//! and Napcat.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use hookrelay_core::dispatcher::Dispatcher;
use hookrelay_core::events::notification_event_channel;
use hookrelay_core::feed::{HttpFeedFetcher, SeenItemStore};
use hookrelay_core::formatter::MessageFormatter;
use hookrelay_core::http::build_client;
use hookrelay_core::normalizer::Normalizer;
use hookrelay_core::processors::{DeliveryWorker, FeedPoller};
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// hookrelay - webhook and feed notification relay
#[derive(Parser, Debug)]
#[command(name = "hookrelay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./hookrelay.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:8000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting hookrelay-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let loaded_config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let delivery = loaded_config.delivery;
    let http_client = build_client(&delivery).map_err(|e| {
        tracing::error!("Failed to build HTTP client: {}", e);
        e
    })?;

    let dispatcher = Dispatcher::from_config(
        &loaded_config.channels,
        http_client.clone(),
        delivery.send_timeout,
    )
    .map_err(|e| {
        tracing::error!("Failed to set up delivery channels: {}", e);
        e
    })?;
    tracing::info!("Delivery channels: {:?}", dispatcher.channel_names());

    let (events_tx, events_rx) = notification_event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn the delivery worker
    let worker = DeliveryWorker::new(
        MessageFormatter::default(),
        dispatcher,
        delivery.notification_delay,
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx.clone(), events_rx));

    // Spawn the feed poller when there is something to poll
    let poller_handle = match loaded_config.rss {
        Some(rss) => {
            let store = SeenItemStore::load(&rss.state_file).await;
            let fetcher = HttpFeedFetcher::new(http_client.clone(), delivery.send_timeout);
            let poller = FeedPoller::new(rss, fetcher, store, events_tx.clone());
            Some(tokio::spawn(poller.run(shutdown_rx.clone())))
        }
        None => {
            tracing::info!("RSS polling disabled, feed poller not started");
            None
        }
    };

    // Build the router
    let state = AppState::new(Normalizer::new(loaded_config.secrets), events_tx);
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the processors; the poller persists its store before exiting
    let _ = shutdown_tx.send(true);
    if let Some(handle) = poller_handle {
        join_task("feed poller", handle).await;
    }
    join_task("delivery worker", worker_handle).await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Wait for a background task, logging it if it panicked or was cancelled.
async fn join_task(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(task = name, error = %e, "Background task failed");
            false
        }
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hookrelay_core=info,tower_http=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
