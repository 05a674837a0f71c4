//! WebSocket half of the relay: accept connections on a dedicated path,
//! persist message events, and re-broadcast every event to all open
//! connections, including the sender. De-duplication of the sender echo is
//! the client's job, keyed on the event id.

mod registry;

pub use registry::{ConnectionId, ConnectionRegistry};

use crate::state::AppState;
use crate::storage::NewMessage;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use classchat_protocol::{now_ms, wire, ChatEvent, EventId, MessageEvent, SenderIdentity};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Dedicated socket path so chat traffic never collides with anything else
/// sharing the port (e.g. a dev server's live-reload socket).
pub const CHAT_WS_PATH: &str = "/api/chat/ws";

pub async fn chat_socket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = state.registry().add(tx);
    debug!(connection = %id, open = state.registry().len(), "socket opened");

    // Write pump: frames queued by broadcasts drain into this socket.
    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    send_welcome(&state).await;

    while let Some(received) = stream.next().await {
        let message = match received {
            Ok(message) => message,
            Err(err) => {
                // Errors are treated like a close: drop this connection only.
                debug!(connection = %id, %err, "socket error");
                break;
            }
        };
        match message {
            Message::Text(text) => handle_frame(&state, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.registry().remove(id);
    write_task.abort();
    debug!(connection = %id, open = state.registry().len(), "socket closed");
}

/// Parse, normalize, persist (messages only), and re-broadcast one frame.
async fn handle_frame(state: &Arc<AppState>, raw: &str) {
    let event = match wire::decode(raw) {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "dropping malformed frame");
            return;
        }
    };

    match event {
        // Ephemeral events: rebroadcast immediately, never persisted.
        ChatEvent::TypingStart(_) | ChatEvent::TypingStop(_) => {
            state.registry().broadcast(&wire::encode(&event));
        }
        ChatEvent::Message(message) => {
            let message = normalize(message);
            let frame = wire::encode(&ChatEvent::Message(message.clone()));

            // Persist before broadcasting so a crash in between loses
            // delivery to peers, never the message itself. A persistence
            // failure is logged and the broadcast still goes out.
            if let Err(err) = state.store().persist(to_new_message(&message)).await {
                warn!(%err, "failed to persist message");
            }
            state.registry().broadcast(&frame);
        }
    }
}

/// Fill in the relay-assigned fields: an id when the sender omitted one,
/// and the authoritative timestamp.
fn normalize(mut message: MessageEvent) -> MessageEvent {
    if message.id.is_none() {
        message.id = Some(EventId::generate());
    }
    message.timestamp_ms = Some(now_ms());
    message
}

fn to_new_message(message: &MessageEvent) -> NewMessage {
    NewMessage {
        external_id: message
            .id
            .as_ref()
            .map(|id| id.0.clone())
            .unwrap_or_default(),
        name: message.sender.name.clone(),
        photo_url: message.sender.photo_url.clone(),
        text: message.text.clone(),
        image: message.image.clone(),
        timestamp_ms: message.timestamp_ms.unwrap_or_else(now_ms),
    }
}

/// Greet a fresh connection, unless an identical welcome was persisted
/// within the configured window. The check is one best-effort query; a race
/// between two connections may still produce a duplicate welcome, which is
/// tolerated.
async fn send_welcome(state: &Arc<AppState>) {
    let config = state.config();
    let since_ms = now_ms() - config.welcome_window_ms;
    match state
        .store()
        .has_recent_message(&config.welcome_sender, &config.welcome_text, since_ms)
        .await
    {
        Ok(true) => return,
        Ok(false) => {}
        Err(err) => {
            warn!(%err, "welcome dedup check failed");
        }
    }

    let message = MessageEvent::compose(
        SenderIdentity::new(config.welcome_sender.clone(), config.welcome_photo_url.clone()),
        config.welcome_text.clone(),
    );
    if let Err(err) = state.store().persist(to_new_message(&message)).await {
        warn!(%err, "failed to persist welcome message");
    }
    state
        .registry()
        .broadcast(&wire::encode(&ChatEvent::Message(message)));
}
