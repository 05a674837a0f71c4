//! Registry of open relay connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Identifier for one open socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The open-connection list for one relay instance.
///
/// Constructed once per server and shared through [`crate::AppState`];
/// broadcast sends every frame to every registered connection, including
/// the one it originated from. Senders whose receiving task has gone away
/// are dropped during the broadcast that discovers them.
#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<String>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, tx: mpsc::UnboundedSender<String>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections
            .lock()
            .expect("connection registry poisoned")
            .insert(id, tx);
        id
    }

    pub fn remove(&self, id: ConnectionId) {
        self.connections
            .lock()
            .expect("connection registry poisoned")
            .remove(&id);
    }

    pub fn len(&self) -> usize {
        self.connections
            .lock()
            .expect("connection registry poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue one frame on every open connection.
    pub fn broadcast(&self, frame: &str) {
        let mut connections = self
            .connections
            .lock()
            .expect("connection registry poisoned");
        connections.retain(|_, tx| tx.send(frame.to_string()).is_ok());
    }
}
