use beacon_core::IceServerConfig;

/// ICE servers handed to every new peer connection.
///
/// Starts with the public STUN server and is replaced by whatever the relay
/// announces in its `iceConfig` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::default()],
        }
    }
}

impl From<Vec<IceServerConfig>> for TransportConfig {
    fn from(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }
}
