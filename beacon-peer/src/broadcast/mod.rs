mod capture;
mod controller;
mod viewer_session;

pub use capture::*;
pub use controller::*;
pub use viewer_session::*;
