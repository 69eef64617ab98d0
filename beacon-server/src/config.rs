use beacon_core::IceServerConfig;
use std::net::SocketAddr;

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP/WebSocket listener binds to
    pub bind_addr: SocketAddr,

    /// STUN/TURN servers pushed to every peer in the `iceConfig` frame
    pub ice_servers: Vec<IceServerConfig>,

    /// Capacity of the relay actor's command queue
    pub command_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ice_servers: vec![IceServerConfig::default()],
            command_buffer: 256,
        }
    }
}
