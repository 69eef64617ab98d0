use beacon_core::{ClientSignal, PeerId, ServerSignal};

/// Where a routed frame has to go.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    To(PeerId, ServerSignal),
    /// Every connected peer except the given one.
    AllExcept(PeerId, ServerSignal),
}

/// Routing table of the relay. Only the relay actor mutates it.
#[derive(Debug, Default)]
pub struct RelayState {
    broadcaster: Option<PeerId>,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcaster(&self) -> Option<PeerId> {
        self.broadcaster
    }

    /// Routes one frame received from `sender`. Payloads are moved through untouched.
    pub fn route(&mut self, sender: PeerId, signal: ClientSignal) -> Vec<Delivery> {
        match signal {
            ClientSignal::Broadcaster => {
                self.broadcaster = Some(sender);
                vec![Delivery::AllExcept(sender, ServerSignal::Broadcaster)]
            }

            ClientSignal::Watcher => match self.broadcaster {
                Some(broadcaster) if broadcaster != sender => vec![Delivery::To(
                    broadcaster,
                    ServerSignal::Watcher { id: sender },
                )],
                _ => Vec::new(),
            },

            ClientSignal::Offer {
                target,
                description,
            } => Self::forward(
                sender,
                target,
                ServerSignal::Offer {
                    id: sender,
                    description,
                },
            ),

            ClientSignal::Answer {
                target,
                description,
            } => Self::forward(
                sender,
                target,
                ServerSignal::Answer {
                    id: sender,
                    description,
                },
            ),

            ClientSignal::Candidate { target, candidate } => Self::forward(
                sender,
                target,
                ServerSignal::Candidate {
                    id: sender,
                    candidate,
                },
            ),
        }
    }

    /// Bookkeeping for a closed connection.
    ///
    /// A departing broadcaster only clears the role: watchers see their own
    /// transport to it fail and wait for the next announce.
    pub fn disconnect(&mut self, departed: PeerId) -> Vec<Delivery> {
        match self.broadcaster {
            Some(broadcaster) if broadcaster == departed => {
                self.broadcaster = None;
                Vec::new()
            }
            Some(broadcaster) => vec![Delivery::To(
                broadcaster,
                ServerSignal::DisconnectPeer { id: departed },
            )],
            None => Vec::new(),
        }
    }

    fn forward(sender: PeerId, target: PeerId, signal: ServerSignal) -> Vec<Delivery> {
        if sender == target {
            return Vec::new();
        }
        vec![Delivery::To(target, signal)]
    }
}
