//! The uniform transport contract both delivery paths implement.
//!
//! Exactly one transport is selected per session (see [`crate::selector`]);
//! calling code holds a `dyn ChatTransport` and never distinguishes which
//! implementation is behind it.

use async_trait::async_trait;
use classchat_protocol::{ChatEvent, MessageEvent};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// One item handed from a transport to the reconciliation layer.
#[derive(Debug, Clone)]
pub enum TransportUpdate {
    /// A single discrete event (relay path).
    Event(ChatEvent),
    /// The entire ordered message log (hosted path; list-replace semantics).
    Snapshot(Vec<MessageEvent>),
    /// The transport's connection state changed.
    State(ConnectionState),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    Send(String),
    #[error("transport task stopped")]
    Closed,
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Contract shared by the relay socket and the hosted fallback.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Hand one event to the transport. A send while disconnected fails
    /// immediately; events are never queued for later delivery.
    async fn send(&self, event: ChatEvent) -> TransportResult<()>;

    /// Subscribe to the transport's update stream.
    fn updates(&self) -> broadcast::Receiver<TransportUpdate>;

    fn connection_state(&self) -> ConnectionState;
}

/// Lock-free connection-state cell shared between a transport handle and its
/// background task.
#[derive(Debug, Default)]
pub(crate) struct StateCell(std::sync::atomic::AtomicU8);

impl StateCell {
    pub fn set(&self, state: ConnectionState) {
        let value = match state {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        };
        self.0.store(value, std::sync::atomic::Ordering::Release);
    }

    pub fn get(&self) -> ConnectionState {
        match self.0.load(std::sync::atomic::Ordering::Acquire) {
            2 => ConnectionState::Connected,
            1 => ConnectionState::Connecting,
            _ => ConnectionState::Disconnected,
        }
    }
}
