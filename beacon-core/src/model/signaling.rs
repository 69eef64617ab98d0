use crate::model::peer::PeerId;
use crate::model::session::Payload;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl Default for IceServerConfig {
    fn default() -> Self {
        Self {
            urls: vec![DEFAULT_STUN_ADDR.to_owned()],
            username: None,
            credential: None,
        }
    }
}

/// Frames a peer sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "camelCase")]
pub enum ClientSignal {
    /// Claim the broadcaster role.
    Broadcaster,
    /// Ask the current broadcaster for an offer.
    Watcher,
    Offer {
        target: PeerId,
        description: Payload,
    },
    Answer {
        target: PeerId,
        description: Payload,
    },
    Candidate {
        target: PeerId,
        candidate: Payload,
    },
}

/// Frames the relay sends to a peer. `id` is always the originating peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "camelCase")]
pub enum ServerSignal {
    Welcome {
        peer_id: PeerId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    /// Someone (re)announced as broadcaster; watchers should ask again.
    Broadcaster,
    Watcher {
        id: PeerId,
    },
    Offer {
        id: PeerId,
        description: Payload,
    },
    Answer {
        id: PeerId,
        description: Payload,
    },
    Candidate {
        id: PeerId,
        candidate: Payload,
    },
    DisconnectPeer {
        id: PeerId,
    },
}
