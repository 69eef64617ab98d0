use async_trait::async_trait;
use beacon_core::{ClientSignal, IceCandidate, Payload, PeerId, SessionDescription};
use tracing::error;

/// Outbound half of the relay connection, as seen by the peer actors.
///
/// Implementors only provide [`send_signal`](SignalingOutput::send_signal);
/// the typed helpers encode payloads on top of it.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_signal(&self, signal: ClientSignal);

    async fn announce_broadcaster(&self) {
        self.send_signal(ClientSignal::Broadcaster).await;
    }

    async fn request_watch(&self) {
        self.send_signal(ClientSignal::Watcher).await;
    }

    async fn send_offer(&self, target: PeerId, offer: &SessionDescription) {
        match Payload::encode(offer) {
            Ok(description) => {
                self.send_signal(ClientSignal::Offer {
                    target,
                    description,
                })
                .await
            }
            Err(e) => error!("Failed to encode offer for {}: {}", target, e),
        }
    }

    async fn send_answer(&self, target: PeerId, answer: &SessionDescription) {
        match Payload::encode(answer) {
            Ok(description) => {
                self.send_signal(ClientSignal::Answer {
                    target,
                    description,
                })
                .await
            }
            Err(e) => error!("Failed to encode answer for {}: {}", target, e),
        }
    }

    async fn send_candidate(&self, target: PeerId, candidate: &IceCandidate) {
        match Payload::encode(candidate) {
            Ok(candidate) => {
                self.send_signal(ClientSignal::Candidate { target, candidate })
                    .await
            }
            Err(e) => error!("Failed to encode candidate for {}: {}", target, e),
        }
    }
}
