//! Registry of open websocket sessions.
//!
//! Each connection task owns its socket; the registry only holds the sending
//! half of the task's outbound queue. Broadcasts work on a snapshot taken
//! under a short read lock, so no lock is held while messages are queued.

use crate::session::protocol::ServerMessage;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// Identifier of one websocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receiving half handed to the connection task.
pub type Outbound = mpsc::UnboundedReceiver<ServerMessage>;

struct Connection {
    sender: mpsc::UnboundedSender<ServerMessage>,
    connected_at: Instant,
}

/// Open sessions in registration order.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<IndexMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its outbound queue.
    pub fn register(&self) -> (ConnectionId, Outbound) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, receiver) = mpsc::unbounded_channel();

        self.connections.write().insert(
            id,
            Connection {
                sender,
                connected_at: Instant::now(),
            },
        );
        tracing::debug!(connection = %id, "browser connected");
        (id, receiver)
    }

    /// Remove a session. Returns `false` if it was already gone.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().shift_remove(&id);
        if let Some(conn) = &removed {
            tracing::debug!(
                connection = %id,
                open_for_ms = conn.connected_at.elapsed().as_millis() as u64,
                "browser disconnected"
            );
        }
        removed.is_some()
    }

    /// Queue `message` for every registered session, in registration order.
    ///
    /// Sessions registered after the snapshot is taken are not included.
    /// Sessions whose task has gone are removed. Returns the ids that were
    /// notified.
    pub fn broadcast(&self, message: &ServerMessage) -> Vec<ConnectionId> {
        let snapshot: Vec<(ConnectionId, mpsc::UnboundedSender<ServerMessage>)> = self
            .connections
            .read()
            .iter()
            .map(|(id, conn)| (*id, conn.sender.clone()))
            .collect();

        let mut notified = Vec::with_capacity(snapshot.len());
        let mut gone = Vec::new();
        for (id, sender) in snapshot {
            if sender.send(message.clone()).is_ok() {
                notified.push(id);
            } else {
                gone.push(id);
            }
        }

        if !gone.is_empty() {
            let mut connections = self.connections.write();
            for id in &gone {
                connections.shift_remove(id);
            }
            tracing::debug!(removed = gone.len(), "dropped closed connections");
        }

        notified
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}
