//! Websocket session protocol.
//!
//! Each browser holds one websocket. The server sends `start` once on
//! connect and `restart` on every change; the browser answers with `result`
//! and `fail` messages that go to the console reporter.

mod handler;
pub mod protocol;
mod socket;

pub use handler::{ExitReceiver, ExitSignal, Handled, SessionHandler};
pub use protocol::{ClientMessage, FailMessage, ResultMessage, ServerMessage};
pub use socket::run_session;
