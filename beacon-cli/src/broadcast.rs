use crate::DEFAULT_RELAY_URL;
use anyhow::{Context, Result, bail};
use beacon_peer::{
    BroadcastController, BroadcastStatus, IvfCapture, RelayConnection, WebRtcConnectionFactory,
};
use clap::Args;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct BroadcastArgs {
    /// WebSocket URL of the relay.
    #[arg(long, env = "BEACON_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    relay: String,

    /// VP8 or VP9 IVF file to share.
    #[arg(long, value_name = "FILE")]
    video: PathBuf,

    /// Start over when the file ends instead of stopping.
    #[arg(long = "loop")]
    looping: bool,
}

pub async fn run(args: BroadcastArgs) -> Result<()> {
    let relay = RelayConnection::connect(&args.relay).await?;
    let client = relay.client.clone();
    println!("{} {}", "🔗 Connected to relay as".green(), relay.peer_id);

    let capture = Arc::new(IvfCapture::new(&args.video, args.looping));
    let mut finished = capture.finished();

    let (controller, handle) = BroadcastController::new(
        capture,
        Arc::new(WebRtcConnectionFactory),
        Arc::new(relay.client),
        relay.signals,
    );
    let task = controller.spawn();

    handle
        .start()
        .await
        .with_context(|| format!("Could not broadcast {}", args.video.display()))?;
    println!(
        "{} {}",
        "🎥 Broadcasting".green().bold(),
        args.video.display()
    );

    let mut status = handle.subscribe();
    let mut relay_lost = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping broadcast");
                break;
            }

            Ok(_) = finished.wait_for(|done| *done) => {
                println!("{}", "Video source ended".yellow());
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

    handle.stop().await?;
    client.close();
    drop(handle);
    task.await.context("Broadcast controller panicked")?;

    if relay_lost {
        bail!("Relay connection lost");
    }
    println!("{}", "✨ Broadcast stopped".green());
    Ok(())
}

fn print_status(status: &BroadcastStatus) {
    if !status.relay_connected {
        println!("{}", "Relay connection lost".red().bold());
        return;
    }
    println!(
        "   {} {} ({} connected)",
        "Viewers:".cyan(),
        status.viewer_count,
        status.connected_viewers
    );
}
