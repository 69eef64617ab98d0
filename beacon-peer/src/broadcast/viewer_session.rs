use crate::error::PeerError;
use crate::session::CandidateQueue;
use crate::signaling::SignalingOutput;
use crate::transport::{
    ConnectionFactory, ConnectionTag, LocalTrack, MediaConnection, TransportConfig, TransportEvent,
};
use anyhow::{Result, bail};
use beacon_core::{IceCandidate, PeerId, SdpKind, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Created,
    OfferSent,
    Answered,
    Connected,
    Closed,
}

/// Broadcaster side of the negotiation with one viewer.
pub struct ViewerSession {
    tag: ConnectionTag,
    state: ViewerState,
    connection: Arc<dyn MediaConnection>,
    tracks: Vec<LocalTrack>,
    candidates: CandidateQueue,
}

impl ViewerSession {
    /// Opens a connection for `tag.peer_id`, attaches `tracks` and sends the offer.
    ///
    /// On failure the half-built connection is closed before returning.
    pub async fn open(
        tag: ConnectionTag,
        tracks: &[LocalTrack],
        factory: &dyn ConnectionFactory,
        config: TransportConfig,
        events: mpsc::Sender<TransportEvent>,
        signaling: &dyn SignalingOutput,
    ) -> Result<Self, PeerError> {
        let connection = factory
            .connect(tag, config, events)
            .await
            .map_err(|e| PeerError::negotiation(tag.peer_id, e))?;

        let mut session = Self {
            tag,
            state: ViewerState::Created,
            connection,
            tracks: tracks.to_vec(),
            candidates: CandidateQueue::new(),
        };

        if let Err(e) = session.send_offer(signaling).await {
            session.close().await;
            return Err(PeerError::negotiation(tag.peer_id, e));
        }

        info!("Offer sent to viewer {}", tag.peer_id);
        Ok(session)
    }

    async fn send_offer(&mut self, signaling: &dyn SignalingOutput) -> Result<()> {
        for track in &self.tracks {
            self.connection.add_track(track.clone()).await?;
        }
        let offer = self.connection.create_offer().await?;
        signaling.send_offer(self.tag.peer_id, &offer).await;
        self.state = ViewerState::OfferSent;
        Ok(())
    }

    pub fn tag(&self) -> ConnectionTag {
        self.tag
    }

    pub fn viewer(&self) -> PeerId {
        self.tag.peer_id
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ViewerState::Closed
    }

    /// Trickles a locally gathered candidate to the viewer. Does not wait for the answer.
    pub async fn forward_local_candidate(
        &self,
        candidate: &IceCandidate,
        signaling: &dyn SignalingOutput,
    ) {
        if self.is_closed() {
            return;
        }
        signaling.send_candidate(self.tag.peer_id, candidate).await;
    }

    pub async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), PeerError> {
        if self.state != ViewerState::OfferSent {
            warn!(
                "Ignoring answer from {} in state {:?}",
                self.tag.peer_id, self.state
            );
            return Ok(());
        }

        self.install_answer(answer)
            .await
            .map_err(|e| PeerError::negotiation(self.tag.peer_id, e))
    }

    async fn install_answer(&mut self, answer: SessionDescription) -> Result<()> {
        if answer.kind != SdpKind::Answer {
            bail!("expected an answer, got {:?}", answer.kind);
        }
        self.connection.set_remote_description(answer).await?;
        self.state = ViewerState::Answered;

        for candidate in self.candidates.mark_remote_applied() {
            self.connection.add_ice_candidate(candidate).await?;
        }
        Ok(())
    }

    /// Applies the candidate now, or holds it until the answer is installed.
    pub async fn add_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError> {
        if self.is_closed() {
            return Ok(());
        }

        if let Some(candidate) = self.candidates.admit(candidate) {
            self.connection
                .add_ice_candidate(candidate)
                .await
                .map_err(|e| PeerError::negotiation(self.tag.peer_id, e))?;
        } else {
            debug!(
                "Queued candidate from {} ({} pending)",
                self.tag.peer_id,
                self.candidates.len()
            );
        }
        Ok(())
    }

    pub fn observe_state(&mut self, state: RTCPeerConnectionState) {
        match state {
            RTCPeerConnectionState::Connected if self.state == ViewerState::Answered => {
                self.state = ViewerState::Connected;
                info!("Viewer {} connected", self.tag.peer_id);
            }
            RTCPeerConnectionState::Failed => {
                warn!("Connection to viewer {} failed", self.tag.peer_id);
            }
            _ => {}
        }
    }

    /// Returns `false` when the session was already closed.
    pub async fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.state = ViewerState::Closed;
        self.candidates.clear();
        self.tracks.clear();

        if let Err(e) = self.connection.close().await {
            warn!("Error closing connection to {}: {}", self.tag.peer_id, e);
        }
        info!("Viewer session {} closed", self.tag.peer_id);
        true
    }
}
