use crate::transport::{ConnectionTag, TransportConfig, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use beacon_core::{IceCandidate, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::track::track_local::TrackLocal;

pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// One negotiated peer connection, as seen by a session.
#[async_trait]
pub trait MediaConnection: Send + Sync {
    async fn add_track(&self, track: LocalTrack) -> Result<()>;

    /// Creates an offer and installs it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Creates an answer and installs it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Opens peer connections whose callbacks report into `events`, tagged with `tag`.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(
        &self,
        tag: ConnectionTag,
        config: TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn MediaConnection>>;
}
