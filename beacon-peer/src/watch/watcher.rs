use crate::error::PeerError;
use crate::signaling::SignalingOutput;
use crate::transport::{ConnectionFactory, ConnectionTag, TransportConfig, TransportEvent};
use crate::watch::{WatcherSession, WatcherState};
use beacon_core::{IceCandidate, Payload, PeerId, ServerSignal, SessionDescription};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

const TRANSPORT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherStatus {
    pub relay_connected: bool,
    /// `Idle` when no negotiation is in progress.
    pub state: WatcherState,
    pub connected: bool,
    pub stream_active: bool,
}

impl Default for WatcherStatus {
    fn default() -> Self {
        Self {
            relay_connected: true,
            state: WatcherState::Idle,
            connected: false,
            stream_active: false,
        }
    }
}

#[derive(Clone)]
pub struct WatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
    status_rx: watch::Receiver<WatcherStatus>,
}

impl WatcherHandle {
    /// Closes the session and stops the watcher.
    pub async fn shutdown(&self) -> Result<(), PeerError> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| PeerError::Shutdown)
    }

    pub fn status(&self) -> WatcherStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WatcherStatus> {
        self.status_rx.clone()
    }
}

/// Viewer actor: keeps asking for the stream and answers whatever offer comes back.
pub struct Watcher {
    session: Option<WatcherSession>,
    /// Candidates that arrived before any offer, per sender, in arrival order.
    early_candidates: HashMap<PeerId, Vec<IceCandidate>>,
    connected: bool,
    next_connection: u64,

    factory: Arc<dyn ConnectionFactory>,
    transport_config: TransportConfig,
    signaling: Arc<dyn SignalingOutput>,

    shutdown_rx: mpsc::Receiver<()>,
    signal_rx: mpsc::Receiver<ServerSignal>,
    relay_connected: bool,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    status_tx: watch::Sender<WatcherStatus>,
}

impl Watcher {
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        signaling: Arc<dyn SignalingOutput>,
        signal_rx: mpsc::Receiver<ServerSignal>,
    ) -> (Self, WatcherHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_BUFFER);
        let (status_tx, status_rx) = watch::channel(WatcherStatus::default());

        let watcher = Self {
            session: None,
            early_candidates: HashMap::new(),
            connected: false,
            next_connection: 0,
            factory,
            transport_config: TransportConfig::default(),
            signaling,
            shutdown_rx,
            signal_rx,
            relay_connected: true,
            transport_rx,
            transport_tx,
            status_tx,
        };

        (
            watcher,
            WatcherHandle {
                shutdown_tx,
                status_rx,
            },
        )
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until shut down or the relay connection is lost.
    pub async fn run(mut self) {
        info!("Watcher started");
        self.signaling.request_watch().await;

        loop {
            tokio::select! {
                cmd = self.shutdown_rx.recv() => {
                    if cmd.is_none() {
                        info!("All watcher handles dropped. Shutting down.");
                    }
                    break;
                }

                signal = self.signal_rx.recv() => {
                    match signal {
                        Some(s) => self.handle_signal(s).await,
                        None => {
                            warn!("Relay connection lost");
                            self.relay_connected = false;
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }
            }
        }

        self.reset().await;
        info!("Watcher finished");
    }

    async fn handle_signal(&mut self, signal: ServerSignal) {
        match signal {
            ServerSignal::IceConfig { ice_servers } => {
                debug!("Using {} ICE server(s) from relay", ice_servers.len());
                self.transport_config = TransportConfig::from(ice_servers);
            }

            ServerSignal::Broadcaster => {
                info!("Broadcaster available, requesting stream");
                self.signaling.request_watch().await;
            }

            ServerSignal::Offer { id, description } => self.handle_offer(id, description).await,

            ServerSignal::Candidate { id, candidate } => self.handle_candidate(id, candidate).await,

            other => debug!("Ignoring {:?}", other),
        }
    }

    async fn handle_offer(&mut self, broadcaster: PeerId, description: Payload) {
        // A new offer always starts from scratch; only the offering peer's
        // early candidates survive the reset.
        let early = self.early_candidates.remove(&broadcaster).unwrap_or_default();
        self.reset().await;

        let offer = match description.decode::<SessionDescription>() {
            Ok(offer) => offer,
            Err(e) => {
                error!("{}", PeerError::negotiation(broadcaster, e));
                return;
            }
        };

        self.next_connection += 1;
        let tag = ConnectionTag {
            peer_id: broadcaster,
            connection: self.next_connection,
        };

        let connection = match self
            .factory
            .connect(tag, self.transport_config.clone(), self.transport_tx.clone())
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                error!("{}", PeerError::negotiation(broadcaster, e));
                return;
            }
        };

        let mut session = WatcherSession::new(tag, connection);
        if !early.is_empty() {
            debug!("Holding {} early candidate(s) from {}", early.len(), broadcaster);
        }
        for candidate in early {
            session.hold_candidate(candidate);
        }

        match session.accept_offer(offer, self.signaling.as_ref()).await {
            Ok(()) => self.session = Some(session),
            Err(e) => {
                error!("{}", e);
                session.close().await;
            }
        }
        self.publish_status();
    }

    async fn handle_candidate(&mut self, from: PeerId, candidate: Payload) {
        if self.session.as_ref().is_some_and(|s| s.broadcaster() != from) {
            debug!("Dropping stale candidate from {}", from);
            return;
        }

        let candidate = match candidate.decode::<IceCandidate>() {
            Ok(candidate) => candidate,
            Err(e) => {
                error!("{}", PeerError::negotiation(from, e));
                if self.session.is_some() {
                    self.reset().await;
                }
                return;
            }
        };

        let Some(session) = self.session.as_mut() else {
            debug!("Holding candidate from {} until its offer", from);
            self.early_candidates.entry(from).or_default().push(candidate);
            return;
        };

        if let Err(e) = session.add_remote_candidate(candidate).await {
            error!("{}", e);
            self.reset().await;
        }
    }

    async fn handle_transport_event(&mut self, evt: TransportEvent) {
        let tag = evt.tag();
        let Some(session) = self.session.as_mut().filter(|s| s.tag() == tag) else {
            debug!("Dropping event from stale connection to {}", tag.peer_id);
            return;
        };

        match evt {
            TransportEvent::CandidateGenerated(_, candidate) => {
                self.signaling.send_candidate(tag.peer_id, &candidate).await;
            }
            TransportEvent::TrackReceived(_, track) => {
                session.bind_track(track);
                self.publish_status();
            }
            TransportEvent::StateChanged(_, state) => match state {
                RTCPeerConnectionState::Connected => {
                    info!("Connected to broadcaster {}", tag.peer_id);
                    self.connected = true;
                    self.publish_status();
                }
                RTCPeerConnectionState::Disconnected => {
                    self.connected = false;
                    self.publish_status();
                }
                RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => {
                    warn!("Connection to broadcaster {} ended ({})", tag.peer_id, state);
                    self.reset().await;
                }
                _ => {}
            },
        }
    }

    /// Back to idle: no session, no queued candidates, no remote media.
    async fn reset(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.early_candidates.clear();
        self.connected = false;
        self.publish_status();
    }

    fn publish_status(&self) {
        let status = WatcherStatus {
            relay_connected: self.relay_connected,
            state: self
                .session
                .as_ref()
                .map_or(WatcherState::Idle, WatcherSession::state),
            connected: self.connected,
            stream_active: self
                .session
                .as_ref()
                .is_some_and(WatcherSession::is_stream_active),
        };
        self.status_tx.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }
}
