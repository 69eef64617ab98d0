use crate::error::PeerError;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use beacon_core::{ClientSignal, PeerId, ServerSignal};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

const WELCOME_TIMEOUT: Duration = Duration::from_secs(5);
const SIGNAL_BUFFER: usize = 256;

/// Writer handle for an open relay connection. Cheap to clone.
#[derive(Clone)]
pub struct RelayClient {
    tx: mpsc::UnboundedSender<Message>,
}

impl RelayClient {
    /// Sends a close frame. The socket is torn down once every clone is dropped.
    pub fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}

#[async_trait]
impl SignalingOutput for RelayClient {
    async fn send_signal(&self, signal: ClientSignal) {
        match serde_json::to_string(&signal) {
            Ok(json) => {
                if self.tx.send(Message::Text(json.into())).is_err() {
                    warn!("Relay connection closed, dropping {:?}", signal);
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }
}

/// A relay connection that completed the `welcome` handshake.
pub struct RelayConnection {
    pub client: RelayClient,
    pub peer_id: PeerId,
    /// Every frame after `welcome`, starting with `iceConfig`.
    /// Closes when the relay goes away.
    pub signals: mpsc::Receiver<ServerSignal>,
}

impl RelayConnection {
    pub async fn connect(url: &str) -> Result<Self, PeerError> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| PeerError::relay_unreachable(url, e))?;
        let (mut sink, mut stream) = socket.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (in_tx, mut in_rx) = mpsc::channel::<ServerSignal>(SIGNAL_BUFFER);

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if sink.send(msg).await.is_err() || closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ServerSignal>(&text) {
                        Ok(signal) => {
                            if in_tx.send(signal).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid ServerSignal from relay: {}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            debug!("Relay reader finished");
        });

        let peer_id = match tokio::time::timeout(WELCOME_TIMEOUT, in_rx.recv()).await {
            Ok(Some(ServerSignal::Welcome { peer_id })) => peer_id,
            Ok(Some(other)) => {
                return Err(PeerError::relay_unreachable(
                    url,
                    format!("expected welcome, got {other:?}"),
                ));
            }
            Ok(None) => {
                return Err(PeerError::relay_unreachable(
                    url,
                    "connection closed before welcome",
                ));
            }
            Err(_) => {
                return Err(PeerError::relay_unreachable(url, "timed out waiting for welcome"));
            }
        };

        info!("Connected to relay {} as {}", url, peer_id);

        Ok(Self {
            client: RelayClient { tx: out_tx },
            peer_id,
            signals: in_rx,
        })
    }
}
