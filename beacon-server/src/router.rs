use crate::config::RelayConfig;
use crate::relay::{Relay, RelayHandle};
use crate::signaling::{Registry, ws_handler};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub relay: RelayHandle,
    pub registry: Registry,
}

impl AppState {
    /// Spawns the relay actor and returns the handles the HTTP layer needs.
    pub fn start(config: &RelayConfig) -> Self {
        let registry = Registry::new();
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);

        let relay = Relay::new(registry.clone(), command_rx, config.ice_servers.clone());
        tokio::spawn(relay.run());

        Self {
            relay: RelayHandle::new(command_tx),
            registry,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "peers": state.registry.len() }))
}

/// Runs the relay on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, config: RelayConfig) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Signaling relay listening on ws://{}/ws", addr);

    let app = router(AppState::start(&config));
    axum::serve(listener, app)
        .await
        .context("Relay server terminated")?;

    Ok(())
}
