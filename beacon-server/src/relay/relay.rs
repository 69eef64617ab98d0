use crate::relay::relay_command::RelayCommand;
use crate::relay::relay_state::{Delivery, RelayState};
use crate::signaling::Registry;
use beacon_core::{IceServerConfig, ServerSignal};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Single owner of the routing table; every frame passes through here in order.
pub struct Relay {
    state: RelayState,
    registry: Registry,
    command_rx: mpsc::Receiver<RelayCommand>,
    ice_servers: Vec<IceServerConfig>,
}

/// Cloneable entry point into a running [`Relay`].
#[derive(Clone)]
pub struct RelayHandle {
    pub(crate) command_tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    pub fn new(command_tx: mpsc::Sender<RelayCommand>) -> Self {
        Self { command_tx }
    }

    pub async fn send(&self, cmd: RelayCommand) -> Result<(), mpsc::error::SendError<RelayCommand>> {
        self.command_tx.send(cmd).await
    }
}

impl Relay {
    pub fn new(
        registry: Registry,
        command_rx: mpsc::Receiver<RelayCommand>,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        Self {
            state: RelayState::new(),
            registry,
            command_rx,
            ice_servers,
        }
    }

    pub async fn run(mut self) {
        info!("Relay event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }

        info!("Command channel closed. Relay event loop finished");
    }

    fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Connected { peer_id, tx } => {
                info!("Peer {} connected", peer_id);
                self.registry.add_peer(peer_id, tx);
                self.registry
                    .send_signal(&peer_id, &ServerSignal::Welcome { peer_id });
                self.registry.send_signal(
                    &peer_id,
                    &ServerSignal::IceConfig {
                        ice_servers: self.ice_servers.clone(),
                    },
                );
            }

            RelayCommand::Signal { peer_id, signal } => {
                debug!("Routing {:?} from {}", signal, peer_id);
                let deliveries = self.state.route(peer_id, signal);
                self.deliver(deliveries);
            }

            RelayCommand::Disconnected { peer_id } => {
                info!("Peer {} disconnected", peer_id);
                self.registry.remove_peer(&peer_id);
                let deliveries = self.state.disconnect(peer_id);
                self.deliver(deliveries);
            }
        }
    }

    fn deliver(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery {
                Delivery::To(peer_id, msg) => self.registry.send_signal(&peer_id, &msg),
                Delivery::AllExcept(excluded, msg) => {
                    self.registry.broadcast_except(&excluded, &msg)
                }
            }
        }
    }
}
