mod peer;
mod session;
mod signaling;

pub use peer::PeerId;
pub use session::{IceCandidate, Payload, SdpKind, SessionDescription};
pub use signaling::{ClientSignal, DEFAULT_STUN_ADDR, IceServerConfig, ServerSignal};
