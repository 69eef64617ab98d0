mod watcher;
mod watcher_session;

pub use watcher::*;
pub use watcher_session::*;
