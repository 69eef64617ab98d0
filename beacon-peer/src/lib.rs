mod broadcast;
mod error;
mod session;
mod signaling;
mod transport;
mod watch;

pub use broadcast::*;
pub use error::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
pub use watch::*;
