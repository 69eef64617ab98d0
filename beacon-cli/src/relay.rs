use anyhow::{Context, Result};
use beacon_core::IceServerConfig;
use beacon_server::RelayConfig;
use clap::Args;
use colored::*;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Args)]
pub struct RelayArgs {
    /// Address the relay listens on.
    #[arg(long, env = "BEACON_ADDR", default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// STUN/TURN URL handed to every peer. Repeatable; defaults to a public STUN server.
    #[arg(long = "ice-server", value_name = "URL")]
    ice_servers: Vec<String>,

    /// Username for `turn:` / `turns:` servers.
    #[arg(long, env = "TURN_USERNAME")]
    turn_username: Option<String>,

    /// Credential for `turn:` / `turns:` servers.
    #[arg(long, env = "TURN_CREDENTIAL", hide_env_values = true)]
    turn_credential: Option<String>,
}

impl RelayArgs {
    fn into_config(self) -> RelayConfig {
        let ice_servers = if self.ice_servers.is_empty() {
            vec![IceServerConfig::default()]
        } else {
            self.ice_servers
                .into_iter()
                .map(|url| {
                    let is_turn = url.starts_with("turn:") || url.starts_with("turns:");
                    IceServerConfig {
                        urls: vec![url],
                        username: self.turn_username.clone().filter(|_| is_turn),
                        credential: self.turn_credential.clone().filter(|_| is_turn),
                    }
                })
                .collect()
        };

        RelayConfig {
            bind_addr: self.addr,
            ice_servers,
            ..Default::default()
        }
    }
}

pub async fn run(args: RelayArgs) -> Result<()> {
    let config = args.into_config();
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    println!(
        "{} ws://{}/ws",
        "📡 Relay listening on".green().bold(),
        config.bind_addr
    );
    for server in &config.ice_servers {
        println!("   {} {}", "ICE:".cyan(), server.urls.join(", "));
    }

    tokio::select! {
        result = beacon_server::serve(listener, config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down relay");
            Ok(())
        }
    }
}
