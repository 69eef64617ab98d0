use async_trait::async_trait;
use beacon_core::{ClientSignal, IceCandidate, PeerId, SessionDescription};
use beacon_peer::SignalingOutput;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};

/// Mock SignalingOutput that captures every frame a peer actor sends to the relay.
#[derive(Clone)]
pub struct MockSignalingOutput {
    tx: mpsc::UnboundedSender<ClientSignal>,
    signals: Arc<Mutex<Vec<ClientSignal>>>,
}

impl MockSignalingOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            signals: Arc::new(Mutex::new(Vec::new())),
        };
        (signaling, rx)
    }

    pub async fn get_signals(&self) -> Vec<ClientSignal> {
        self.signals.lock().await.clone()
    }

    pub async fn count(&self, predicate: impl Fn(&ClientSignal) -> bool) -> usize {
        self.signals.lock().await.iter().filter(|s| predicate(*s)).count()
    }

    pub async fn offers_to(&self, peer_id: &PeerId) -> Vec<SessionDescription> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                ClientSignal::Offer {
                    target,
                    description,
                } if target == peer_id => description.decode().ok(),
                _ => None,
            })
            .collect()
    }

    pub async fn answers_to(&self, peer_id: &PeerId) -> Vec<SessionDescription> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                ClientSignal::Answer {
                    target,
                    description,
                } if target == peer_id => description.decode().ok(),
                _ => None,
            })
            .collect()
    }

    pub async fn candidates_to(&self, peer_id: &PeerId) -> Vec<IceCandidate> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                ClientSignal::Candidate { target, candidate } if target == peer_id => {
                    candidate.decode().ok()
                }
                _ => None,
            })
            .collect()
    }

    /// Polls until `predicate` holds for at least `n` captured frames.
    pub async fn wait_for_count(
        &self,
        predicate: impl Fn(&ClientSignal) -> bool,
        n: usize,
        timeout_ms: u64,
    ) -> bool {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            if self.count(&predicate).await >= n {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn send_signal(&self, signal: ClientSignal) {
        tracing::debug!("[MockSignaling] {:?}", signal);

        self.signals.lock().await.push(signal.clone());
        let _ = self.tx.send(signal);
    }
}

pub fn is_announce(signal: &ClientSignal) -> bool {
    matches!(signal, ClientSignal::Broadcaster)
}

pub fn is_watch_request(signal: &ClientSignal) -> bool {
    matches!(signal, ClientSignal::Watcher)
}
