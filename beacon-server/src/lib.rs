mod config;
mod relay;
mod router;
mod signaling;

pub use config::*;
pub use relay::*;
pub use router::*;
pub use signaling::*;
