use crate::broadcast::{CaptureSource, ViewerSession, ViewerState};
use crate::error::PeerError;
use crate::signaling::SignalingOutput;
use crate::transport::{
    ConnectionFactory, ConnectionTag, LocalTrack, TransportConfig, TransportEvent,
};
use beacon_core::{IceCandidate, PeerId, ServerSignal, SessionDescription};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 32;
const TRANSPORT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStatus {
    pub relay_connected: bool,
    pub broadcasting: bool,
    /// Open viewer sessions.
    pub viewer_count: usize,
    /// Viewer sessions whose transport reached `Connected`.
    pub connected_viewers: usize,
}

pub enum BroadcastCommand {
    Start {
        reply: oneshot::Sender<Result<(), PeerError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Operator side of a running [`BroadcastController`].
#[derive(Clone)]
pub struct BroadcastHandle {
    command_tx: mpsc::Sender<BroadcastCommand>,
    status_rx: watch::Receiver<BroadcastStatus>,
}

impl BroadcastHandle {
    pub async fn start(&self) -> Result<(), PeerError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(BroadcastCommand::Start { reply })
            .await
            .map_err(|_| PeerError::Shutdown)?;
        rx.await.map_err(|_| PeerError::Shutdown)?
    }

    /// Resolves once capture is released and every viewer session is closed.
    pub async fn stop(&self) -> Result<(), PeerError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(BroadcastCommand::Stop { reply })
            .await
            .map_err(|_| PeerError::Shutdown)?;
        rx.await.map_err(|_| PeerError::Shutdown)
    }

    pub fn status(&self) -> BroadcastStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BroadcastStatus> {
        self.status_rx.clone()
    }
}

/// Owns the capture source and one [`ViewerSession`] per viewer.
///
/// Reacts to operator commands, relay signals and transport events from a
/// single task; peer connection callbacks never touch session state directly.
pub struct BroadcastController {
    capture: Arc<dyn CaptureSource>,
    tracks: Option<Vec<LocalTrack>>,
    sessions: HashMap<PeerId, ViewerSession>,
    next_connection: u64,

    factory: Arc<dyn ConnectionFactory>,
    transport_config: TransportConfig,
    signaling: Arc<dyn SignalingOutput>,

    command_rx: mpsc::Receiver<BroadcastCommand>,
    signal_rx: mpsc::Receiver<ServerSignal>,
    relay_connected: bool,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    status_tx: watch::Sender<BroadcastStatus>,
}

impl BroadcastController {
    /// `signal_rx` carries every frame the relay sends this peer; it closing
    /// means the relay connection is gone.
    pub fn new(
        capture: Arc<dyn CaptureSource>,
        factory: Arc<dyn ConnectionFactory>,
        signaling: Arc<dyn SignalingOutput>,
        signal_rx: mpsc::Receiver<ServerSignal>,
    ) -> (Self, BroadcastHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_BUFFER);
        let (status_tx, status_rx) = watch::channel(BroadcastStatus {
            relay_connected: true,
            ..Default::default()
        });

        let controller = Self {
            capture,
            tracks: None,
            sessions: HashMap::new(),
            next_connection: 0,
            factory,
            transport_config: TransportConfig::default(),
            signaling,
            command_rx,
            signal_rx,
            relay_connected: true,
            transport_rx,
            transport_tx,
            status_tx,
        };

        (
            controller,
            BroadcastHandle {
                command_tx,
                status_rx,
            },
        )
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until every [`BroadcastHandle`] is dropped.
    pub async fn run(mut self) {
        info!("Broadcast controller started");

        // Claim the role right away so the relay routes watchers here.
        self.signaling.announce_broadcaster().await;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down broadcaster.");
                            break;
                        }
                    }
                }

                signal = self.signal_rx.recv(), if self.relay_connected => {
                    match signal {
                        Some(s) => self.handle_signal(s).await,
                        None => {
                            warn!("Relay connection lost");
                            self.relay_connected = false;
                            self.publish_status();
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }
            }
        }

        self.stop().await;
        info!("Broadcast controller finished");
    }

    async fn handle_command(&mut self, cmd: BroadcastCommand) {
        match cmd {
            BroadcastCommand::Start { reply } => {
                let result = self.start().await;
                let _ = reply.send(result);
            }
            BroadcastCommand::Stop { reply } => {
                self.stop().await;
                let _ = reply.send(());
            }
        }
    }

    async fn start(&mut self) -> Result<(), PeerError> {
        if self.tracks.is_some() {
            debug!("Already broadcasting");
            return Ok(());
        }

        let tracks = self.capture.acquire().await?;
        info!("Broadcast started with {} track(s)", tracks.len());
        self.tracks = Some(tracks);

        self.signaling.announce_broadcaster().await;
        self.publish_status();
        Ok(())
    }

    async fn stop(&mut self) {
        if self.tracks.is_none() && self.sessions.is_empty() {
            return;
        }

        if self.tracks.take().is_some() {
            self.capture.release().await;
        }

        for (_, mut session) in self.sessions.drain() {
            session.close().await;
        }

        info!("Broadcast stopped");
        self.publish_status();
    }

    async fn handle_signal(&mut self, signal: ServerSignal) {
        match signal {
            ServerSignal::Welcome { peer_id } => debug!("Relay welcome as {}", peer_id),

            ServerSignal::IceConfig { ice_servers } => {
                debug!("Using {} ICE server(s) from relay", ice_servers.len());
                self.transport_config = TransportConfig::from(ice_servers);
            }

            ServerSignal::Watcher { id } => self.handle_watch_request(id).await,

            ServerSignal::Answer { id, description } => {
                let Some(session) = self.sessions.get_mut(&id) else {
                    debug!("Answer from unknown viewer {}", id);
                    return;
                };
                let result = match description.decode::<SessionDescription>() {
                    Ok(answer) => session.apply_answer(answer).await,
                    Err(e) => Err(PeerError::negotiation(id, e)),
                };
                if let Err(e) = result {
                    error!("{}", e);
                    self.close_session(&id).await;
                }
            }

            ServerSignal::Candidate { id, candidate } => {
                let Some(session) = self.sessions.get_mut(&id) else {
                    debug!("Candidate from unknown viewer {}", id);
                    return;
                };
                let result = match candidate.decode::<IceCandidate>() {
                    Ok(candidate) => session.add_remote_candidate(candidate).await,
                    Err(e) => Err(PeerError::negotiation(id, e)),
                };
                if let Err(e) = result {
                    error!("{}", e);
                    self.close_session(&id).await;
                }
            }

            ServerSignal::DisconnectPeer { id } => self.close_session(&id).await,

            ServerSignal::Broadcaster => {
                warn!("Another peer announced itself as broadcaster");
            }

            ServerSignal::Offer { id, .. } => warn!("Unexpected offer from {}", id),
        }
    }

    async fn handle_watch_request(&mut self, viewer: PeerId) {
        let Some(tracks) = &self.tracks else {
            debug!("Ignoring watch request from {}: not broadcasting", viewer);
            return;
        };

        if let Some(mut previous) = self.sessions.remove(&viewer) {
            previous.close().await;
        }

        self.next_connection += 1;
        let tag = ConnectionTag {
            peer_id: viewer,
            connection: self.next_connection,
        };

        match ViewerSession::open(
            tag,
            tracks,
            self.factory.as_ref(),
            self.transport_config.clone(),
            self.transport_tx.clone(),
            self.signaling.as_ref(),
        )
        .await
        {
            Ok(session) => {
                self.sessions.insert(session.viewer(), session);
            }
            Err(e) => error!("{}", e),
        }
        self.publish_status();
    }

    async fn handle_transport_event(&mut self, evt: TransportEvent) {
        let tag = evt.tag();
        let Some(session) = self
            .sessions
            .get_mut(&tag.peer_id)
            .filter(|session| session.tag() == tag)
        else {
            debug!("Dropping event from stale connection to {}", tag.peer_id);
            return;
        };

        match evt {
            TransportEvent::CandidateGenerated(_, candidate) => {
                session
                    .forward_local_candidate(&candidate, self.signaling.as_ref())
                    .await;
            }
            TransportEvent::StateChanged(_, state) => {
                session.observe_state(state);
                self.publish_status();
            }
            TransportEvent::TrackReceived(_, track) => {
                debug!("Ignoring {} track from viewer {}", track.kind(), tag.peer_id);
            }
        }
    }

    async fn close_session(&mut self, viewer: &PeerId) {
        if let Some(mut session) = self.sessions.remove(viewer) {
            session.close().await;
            self.publish_status();
        }
    }

    fn publish_status(&self) {
        let status = BroadcastStatus {
            relay_connected: self.relay_connected,
            broadcasting: self.tracks.is_some(),
            viewer_count: self.sessions.len(),
            connected_viewers: self
                .sessions
                .values()
                .filter(|session| session.state() == ViewerState::Connected)
                .count(),
        };
        self.status_tx.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }
}

