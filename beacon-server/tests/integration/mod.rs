
use beacon_core::IceServerConfig;
use beacon_server::{Registry, Relay, RelayHandle};
use tokio::sync::mpsc;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_relay() -> (RelayHandle, Registry) {
    let registry = Registry::new();
    let (cmd_tx, cmd_rx) = mpsc::channel(100);

    let relay = Relay::new(registry.clone(), cmd_rx, vec![IceServerConfig::default()]);
    tokio::spawn(relay.run());

    (RelayHandle::new(cmd_tx), registry)
}
