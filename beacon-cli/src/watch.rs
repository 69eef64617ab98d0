use crate::DEFAULT_RELAY_URL;
use anyhow::{Context, Result, bail};
use beacon_peer::{RelayConnection, Watcher, WatcherStatus, WebRtcConnectionFactory};
use clap::Args;
use colored::*;
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct WatchArgs {
    /// WebSocket URL of the relay.
    #[arg(long, env = "BEACON_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    relay: String,
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let relay = RelayConnection::connect(&args.relay).await?;
    let client = relay.client.clone();
    println!("{} {}", "🔗 Connected to relay as".green(), relay.peer_id);
    println!("{}", "👀 Waiting for a broadcast...".cyan());

    let (watcher, handle) = Watcher::new(
        Arc::new(WebRtcConnectionFactory),
        Arc::new(relay.client),
        relay.signals,
    );
    let task = watcher.spawn();

    let mut status = handle.subscribe();
    let mut relay_lost = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, leaving broadcast");
                break;
            }

            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                print_status(&current);
                if !current.relay_connected {
                    relay_lost = true;
                    break;
                }
            }
        }
    }

    // The watcher is already gone when the relay dropped.
    let _ = handle.shutdown().await;
    client.close();
    task.await.context("Watcher panicked")?;

    if relay_lost {
        bail!("Relay connection lost");
    }
    Ok(())
}

fn print_status(status: &WatcherStatus) {
    if !status.relay_connected {
        println!("{}", "Relay connection lost".red().bold());
    } else if status.stream_active {
        println!("{}", "📺 Receiving broadcast".green().bold());
    } else if status.connected {
        println!("{}", "Connected to broadcaster".green());
    } else {
        println!("   {} {:?}", "Negotiation:".cyan(), status.state);
    }
}
