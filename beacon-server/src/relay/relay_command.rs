use axum::extract::ws::Message;
use beacon_core::{ClientSignal, PeerId};
use tokio::sync::mpsc;

/// Input of the relay actor, produced by the WebSocket handlers.
#[derive(Debug)]
pub enum RelayCommand {
    /// A socket was accepted; `tx` feeds its writer task.
    Connected {
        peer_id: PeerId,
        tx: mpsc::UnboundedSender<Message>,
    },

    /// A decoded frame from `peer_id`.
    Signal {
        peer_id: PeerId,
        signal: ClientSignal,
    },

    Disconnected { peer_id: PeerId },
}
