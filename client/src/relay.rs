//! Socket client half of the relay transport.
//!
//! One connection per page session. A lost connection flips the state to
//! disconnected and schedules exactly one reconnection attempt after a fixed
//! delay, for as long as a sender identity is still set; there is no backoff
//! and no jitter. Sends while disconnected fail immediately and nothing is
//! queued.

use crate::transport::{
    ChatTransport, ConnectionState, StateCell, TransportError, TransportResult, TransportUpdate,
};
use async_trait::async_trait;
use classchat_protocol::{wire, ChatEvent};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

const UPDATE_CHANNEL_CAPACITY: usize = 256;

pub struct RelayTransport {
    updates_tx: broadcast::Sender<TransportUpdate>,
    command_tx: mpsc::UnboundedSender<String>,
    state: Arc<StateCell>,
    identity_active: Arc<AtomicBool>,
}

impl RelayTransport {
    /// Start the connection loop against the relay's socket URL
    /// (e.g. `ws://host:8080/api/chat/ws`).
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = Arc::new(StateCell::default());
        let identity_active = Arc::new(AtomicBool::new(true));

        tokio::spawn(run(
            url,
            updates_tx.clone(),
            command_rx,
            Arc::clone(&state),
            Arc::clone(&identity_active),
        ));

        Self {
            updates_tx,
            command_tx,
            state,
            identity_active,
        }
    }

    /// Clearing the identity stops the reconnect loop after the next
    /// disconnect; the UI calls this when the user logs out.
    pub fn set_identity_active(&self, active: bool) {
        self.identity_active.store(active, Ordering::Release);
    }
}

#[async_trait]
impl ChatTransport for RelayTransport {
    async fn send(&self, event: ChatEvent) -> TransportResult<()> {
        if self.state.get() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }
        self.command_tx
            .send(wire::encode(&event))
            .map_err(|_| TransportError::Closed)
    }

    fn updates(&self) -> broadcast::Receiver<TransportUpdate> {
        self.updates_tx.subscribe()
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }
}

async fn run(
    url: String,
    updates_tx: broadcast::Sender<TransportUpdate>,
    mut command_rx: mpsc::UnboundedReceiver<String>,
    state: Arc<StateCell>,
    identity_active: Arc<AtomicBool>,
) {
    let set_state = |next: ConnectionState| {
        state.set(next);
        let _ = updates_tx.send(TransportUpdate::State(next));
    };

    loop {
        // Sends are rejected while disconnected, but a frame accepted just
        // before the connection dropped may still sit in the channel; it
        // must not flush into the next connection.
        while command_rx.try_recv().is_ok() {}

        set_state(ConnectionState::Connecting);
        match connect_async(&url).await {
            Ok((stream, _)) => {
                set_state(ConnectionState::Connected);
                let (mut sink, mut reader) = stream.split();

                loop {
                    tokio::select! {
                        frame = command_rx.recv() => match frame {
                            Some(frame) => {
                                if sink.send(Message::Text(frame.into())).await.is_err() {
                                    break;
                                }
                            }
                            // Transport handle dropped; stop for good.
                            None => return,
                        },
                        received = reader.next() => match received {
                            Some(Ok(Message::Text(text))) => match wire::decode(text.as_str()) {
                                Ok(event) => {
                                    let _ = updates_tx.send(TransportUpdate::Event(event));
                                }
                                Err(err) => debug!(%err, "dropping malformed frame"),
                            },
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                debug!(%err, "relay socket error");
                                break;
                            }
                        },
                    }
                }
            }
            Err(err) => {
                debug!(%err, "relay connection failed");
            }
        }

        set_state(ConnectionState::Disconnected);
        if !identity_active.load(Ordering::Acquire) {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
