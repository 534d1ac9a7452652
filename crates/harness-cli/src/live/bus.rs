//! Change notification bus.
//!
//! One bus per server. File watchers publish, the reload forwarder and tests
//! subscribe. Events carry no payload: any change restarts every browser.

use tokio::sync::broadcast;

const BUS_CAPACITY: usize = 64;

/// A file under the working directory changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent;

/// Broadcast channel for [`ChangeEvent`]s.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish a change. Returns how many subscribers will see it.
    pub fn publish(&self) -> usize {
        self.tx.send(ChangeEvent).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}
