use beacon_core::PeerId;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why the local capture source could not be opened. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaAcquisitionError {
    #[error("permission to capture the screen was denied")]
    PermissionDenied,

    #[error("screen capture requires a secure context (HTTPS or localhost)")]
    InsecureContext,

    #[error("capture source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("failed to start broadcast: {0}")]
    MediaAcquisition(#[from] MediaAcquisitionError),

    /// Scoped to one session; the caller closes it and carries on.
    #[error("negotiation with {peer_id} failed: {source}")]
    Negotiation {
        peer_id: PeerId,
        #[source]
        source: BoxError,
    },

    #[error("relay at {url} is unreachable: {source}")]
    RelayUnreachable {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("peer runtime has shut down")]
    Shutdown,
}

impl PeerError {
    pub fn negotiation(peer_id: PeerId, source: impl Into<BoxError>) -> Self {
        Self::Negotiation {
            peer_id,
            source: source.into(),
        }
    }

    pub fn relay_unreachable(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::RelayUnreachable {
            url: url.into(),
            source: source.into(),
        }
    }
}
