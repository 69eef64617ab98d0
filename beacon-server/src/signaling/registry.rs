use axum::extract::ws::Message;
use beacon_core::{PeerId, ServerSignal};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Outbound half of every open WebSocket, keyed by the relay-assigned id.
///
/// Written only by the relay actor; HTTP handlers may read it concurrently.
#[derive(Clone, Default)]
pub struct Registry {
    peers: Arc<DashMap<PeerId, mpsc::UnboundedSender<Message>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        self.peers.insert(peer_id, tx);
    }

    pub(crate) fn remove_peer(&self, peer_id: &PeerId) {
        self.peers.remove(peer_id);
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Best effort: a peer that is already gone is skipped silently.
    pub(crate) fn send_signal(&self, peer_id: &PeerId, msg: &ServerSignal) {
        let Some(message) = encode(msg) else { return };

        if let Some(peer) = self.peers.get(peer_id) {
            if peer.send(message).is_err() {
                debug!("WS writer for {} already closed", peer_id);
            }
        } else {
            debug!("Dropping {:?} for disconnected peer {}", msg, peer_id);
        }
    }

    pub(crate) fn broadcast_except(&self, excluded: &PeerId, msg: &ServerSignal) {
        let Some(message) = encode(msg) else { return };

        for peer in self.peers.iter().filter(|entry| entry.key() != excluded) {
            let _ = peer.value().send(message.clone());
        }
    }
}

fn encode(msg: &ServerSignal) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            error!("Failed to serialize signal message: {}", e);
            None
        }
    }
}
