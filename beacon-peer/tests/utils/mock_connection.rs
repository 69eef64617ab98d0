use anyhow::{Result, bail};
use async_trait::async_trait;
use beacon_core::{IceCandidate, PeerId, SdpKind, SessionDescription};
use beacon_peer::{
    ConnectionFactory, ConnectionTag, LocalTrack, MediaConnection, TransportConfig, TransportEvent,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use webrtc::track::track_local::TrackLocal;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// One call made on a [`MockConnection`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCall {
    AddTrack(String),
    CreateOffer,
    CreateAnswer,
    SetRemote(SdpKind),
    AddCandidate(String),
    Close,
}

/// Peer connection stand-in that records calls and can raise transport events.
pub struct MockConnection {
    pub tag: ConnectionTag,
    calls: Mutex<Vec<ConnectionCall>>,
    events: mpsc::Sender<TransportEvent>,
    fail_remote_description: bool,
}

impl MockConnection {
    pub async fn calls(&self) -> Vec<ConnectionCall> {
        self.calls.lock().await.clone()
    }

    pub async fn applied_candidates(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                ConnectionCall::AddCandidate(candidate) => Some(candidate.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn close_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| **call == ConnectionCall::Close)
            .count()
    }

    /// Simulates the ICE agent gathering a local candidate.
    pub async fn emit_candidate(&self, candidate: &str) {
        let _ = self
            .events
            .send(TransportEvent::CandidateGenerated(
                self.tag,
                IceCandidate::new(candidate),
            ))
            .await;
    }

    pub async fn emit_state(&self, state: RTCPeerConnectionState) {
        let _ = self
            .events
            .send(TransportEvent::StateChanged(self.tag, state))
            .await;
    }

    async fn record(&self, call: ConnectionCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl MediaConnection for MockConnection {
    async fn add_track(&self, track: LocalTrack) -> Result<()> {
        self.record(ConnectionCall::AddTrack(track.id().to_owned()))
            .await;
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.record(ConnectionCall::CreateOffer).await;
        Ok(SessionDescription::offer(format!(
            "v=0 mock-offer {}",
            self.tag.connection
        )))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.record(ConnectionCall::CreateAnswer).await;
        Ok(SessionDescription::answer(format!(
            "v=0 mock-answer {}",
            self.tag.connection
        )))
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.record(ConnectionCall::SetRemote(description.kind))
            .await;
        if self.fail_remote_description {
            bail!("remote description rejected");
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.record(ConnectionCall::AddCandidate(candidate.candidate))
            .await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(ConnectionCall::Close).await;
        Ok(())
    }
}

/// Hands out [`MockConnection`]s and keeps them for inspection.
#[derive(Clone, Default)]
pub struct MockConnectionFactory {
    connections: Arc<Mutex<Vec<Arc<MockConnection>>>>,
    fail_remote_description: bool,
}

impl MockConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connection rejects the remote description.
    pub fn rejecting_remote_description() -> Self {
        Self {
            fail_remote_description: true,
            ..Self::default()
        }
    }

    pub async fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().await.clone()
    }

    pub async fn connections_for(&self, peer_id: &PeerId) -> Vec<Arc<MockConnection>> {
        self.connections
            .lock()
            .await
            .iter()
            .filter(|c| c.tag.peer_id == *peer_id)
            .cloned()
            .collect()
    }

    /// Polls until at least `n` connections to `peer_id` were opened.
    pub async fn wait_for_connections(
        &self,
        peer_id: &PeerId,
        n: usize,
        timeout_ms: u64,
    ) -> Vec<Arc<MockConnection>> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            let connections = self.connections_for(peer_id).await;
            if connections.len() >= n || start.elapsed() > timeout {
                return connections;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn connect(
        &self,
        tag: ConnectionTag,
        _config: TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn MediaConnection>> {
        let connection = Arc::new(MockConnection {
            tag,
            calls: Mutex::new(Vec::new()),
            events,
            fail_remote_description: self.fail_remote_description,
        });
        self.connections.lock().await.push(connection.clone());
        Ok(connection)
    }
}

/// Polls `connection` until `predicate` holds for its call log.
pub async fn wait_for_calls(
    connection: &MockConnection,
    predicate: impl Fn(&[ConnectionCall]) -> bool,
    timeout_ms: u64,
) -> Vec<ConnectionCall> {
    let start = Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    loop {
        let calls = connection.calls().await;
        if predicate(&calls) || start.elapsed() > timeout {
            return calls;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
