use beacon_core::{IceCandidate, PeerId};
use std::sync::Arc;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::track::track_remote::TrackRemote;

/// Identifies one peer connection.
///
/// `connection` is bumped every time a session for the same remote peer is
/// replaced, so late callbacks from a torn-down connection can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionTag {
    pub peer_id: PeerId,
    pub connection: u64,
}

/// Events a peer connection raises for the actor that owns it.
pub enum TransportEvent {
    /// A local ICE candidate was gathered and has to be trickled to the remote side.
    CandidateGenerated(ConnectionTag, IceCandidate),

    StateChanged(ConnectionTag, RTCPeerConnectionState),

    /// Remote media arrived (watcher side).
    TrackReceived(ConnectionTag, Arc<TrackRemote>),
}

impl TransportEvent {
    pub fn tag(&self) -> ConnectionTag {
        match self {
            Self::CandidateGenerated(tag, _)
            | Self::StateChanged(tag, _)
            | Self::TrackReceived(tag, _) => *tag,
        }
    }
}
