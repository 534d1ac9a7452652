//! Live restart: change bus, connection registry and file watching.

mod bus;
mod registry;
mod watcher;

pub use bus::{ChangeBus, ChangeEvent};
pub use registry::{ConnectionId, ConnectionRegistry, Outbound};
pub use watcher::{FileChange, FileWatcher, WatchOptions, pump_changes};

use crate::session::protocol::ServerMessage;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Turn every change on the bus into a `restart` broadcast.
///
/// The subscription is taken before the task is spawned, so changes
/// published after this call returns are never missed.
pub fn spawn_reload_forwarder(bus: &ChangeBus, registry: Arc<ConnectionRegistry>) -> JoinHandle<()> {
    let mut changes = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "change bus lagged; coalescing into one restart");
                }
                Err(RecvError::Closed) => break,
            }
            let notified = registry.broadcast(&ServerMessage::restart());
            tracing::info!(browsers = notified.len(), "restarting test run");
        }
    })
}
