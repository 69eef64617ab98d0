mod broadcast;
mod relay;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:3000/ws";

#[derive(Parser)]
#[command(name = "beacon", bin_name = "beacon", version)]
#[command(about = "One-to-many WebRTC broadcast over a WebSocket signaling relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay(relay::RelayArgs),
    /// Share a video file with every watcher.
    Broadcast(broadcast::BroadcastArgs),
    /// Receive the current broadcast.
    Watch(watch::WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay(args) => relay::run(args).await,
        Commands::Broadcast(args) => broadcast::run(args).await,
        Commands::Watch(args) => watch::run(args).await,
    }
}
