use crate::error::PeerError;
use crate::session::CandidateQueue;
use crate::signaling::SignalingOutput;
use crate::transport::{ConnectionTag, MediaConnection};
use anyhow::{Result, bail};
use beacon_core::{IceCandidate, PeerId, SdpKind, SessionDescription};
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::track::track_remote::TrackRemote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    OfferApplied,
    AnswerSent,
    Closed,
}

/// Viewer side of one negotiation with the broadcaster.
///
/// Every offer gets a fresh session; the previous one is closed by the owner.
pub struct WatcherSession {
    tag: ConnectionTag,
    state: WatcherState,
    connection: Arc<dyn MediaConnection>,
    candidates: CandidateQueue,
    remote_tracks: Vec<Arc<TrackRemote>>,
}

impl WatcherSession {
    pub fn new(tag: ConnectionTag, connection: Arc<dyn MediaConnection>) -> Self {
        Self {
            tag,
            state: WatcherState::Idle,
            connection,
            candidates: CandidateQueue::new(),
            remote_tracks: Vec::new(),
        }
    }

    pub fn tag(&self) -> ConnectionTag {
        self.tag
    }

    pub fn broadcaster(&self) -> PeerId {
        self.tag.peer_id
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn is_stream_active(&self) -> bool {
        !self.remote_tracks.is_empty()
    }

    /// Installs the offer, flushes held candidates in order, then answers.
    pub async fn accept_offer(
        &mut self,
        offer: SessionDescription,
        signaling: &dyn SignalingOutput,
    ) -> Result<(), PeerError> {
        if self.state != WatcherState::Idle {
            warn!(
                "Ignoring second offer for session with {} in state {:?}",
                self.tag.peer_id, self.state
            );
            return Ok(());
        }

        self.negotiate(offer, signaling)
            .await
            .map_err(|e| PeerError::negotiation(self.tag.peer_id, e))
    }

    async fn negotiate(
        &mut self,
        offer: SessionDescription,
        signaling: &dyn SignalingOutput,
    ) -> Result<()> {
        if offer.kind != SdpKind::Offer {
            bail!("expected an offer, got {:?}", offer.kind);
        }

        self.connection.set_remote_description(offer).await?;
        self.state = WatcherState::OfferApplied;

        for candidate in self.candidates.mark_remote_applied() {
            self.connection.add_ice_candidate(candidate).await?;
        }

        let answer = self.connection.create_answer().await?;
        signaling.send_answer(self.tag.peer_id, &answer).await;
        self.state = WatcherState::AnswerSent;

        info!("Answer sent to broadcaster {}", self.tag.peer_id);
        Ok(())
    }

    /// Queues a candidate that arrived before this session's offer.
    pub fn hold_candidate(&mut self, candidate: IceCandidate) {
        if self.state != WatcherState::Idle {
            return;
        }
        let applied_now = self.candidates.admit(candidate);
        debug_assert!(applied_now.is_none());
    }

    pub async fn add_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError> {
        if self.state == WatcherState::Closed {
            return Ok(());
        }

        if let Some(candidate) = self.candidates.admit(candidate) {
            self.connection
                .add_ice_candidate(candidate)
                .await
                .map_err(|e| PeerError::negotiation(self.tag.peer_id, e))?;
        } else {
            debug!("Queued candidate from {}", self.tag.peer_id);
        }
        Ok(())
    }

    pub fn bind_track(&mut self, track: Arc<TrackRemote>) {
        if self.state == WatcherState::Closed {
            return;
        }
        info!(
            "Receiving {} from {} ({})",
            track.kind(),
            self.tag.peer_id,
            track.codec().capability.mime_type
        );
        self.remote_tracks.push(track);
    }

    pub async fn close(&mut self) {
        if self.state == WatcherState::Closed {
            return;
        }
        self.state = WatcherState::Closed;
        self.candidates.clear();
        self.remote_tracks.clear();

        if let Err(e) = self.connection.close().await {
            warn!("Error closing connection to {}: {}", self.tag.peer_id, e);
        }
        debug!("Watcher session with {} closed", self.tag.peer_id);
    }
}
