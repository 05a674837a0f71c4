//! Chat protocol models shared across ClassChat clients and the relay service.

pub mod history;
pub mod wire;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier assigned to a chat event when it is created.
///
/// The id is the sole de-duplication key: a client that receives two events
/// with the same id renders only the first. Once assigned it never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Snapshot of the sender identity at the time an event was created.
///
/// The display name is not a stable user identifier; renaming creates a new
/// identity going forward and nothing links the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    pub name: String,
    /// Avatar snapshot, a data-URI or plain URL.
    pub photo_url: String,
}

impl SenderIdentity {
    pub fn new(name: impl Into<String>, photo_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            photo_url: photo_url.into(),
        }
    }
}

/// A chat message travelling over a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// None only for legacy inbound frames; the relay fills it before
    /// persisting or broadcasting.
    pub id: Option<EventId>,
    pub sender: SenderIdentity,
    /// Plain text body, no markup.
    pub text: String,
    /// Optional image attachment as a data-URI.
    pub image: Option<String>,
    /// Creation time in epoch millis. The relay normalizes this at
    /// persistence time; the hosted service assigns its own.
    pub timestamp_ms: Option<i64>,
    /// Local-only view flag. Never transmitted; every other client keeps
    /// seeing the message.
    #[serde(default)]
    pub soft_deleted: bool,
}

impl MessageEvent {
    /// Build an outgoing message with a client-assigned id and timestamp.
    pub fn compose(sender: SenderIdentity, text: impl Into<String>) -> Self {
        Self {
            id: Some(EventId::generate()),
            sender,
            text: text.into(),
            image: None,
            timestamp_ms: Some(now_ms()),
            soft_deleted: false,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// The unit exchanged over either transport.
///
/// Only `Message` is ever persisted; the typing variants are ephemeral and
/// exist only in transit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatEvent {
    Message(MessageEvent),
    TypingStart(SenderIdentity),
    TypingStop(SenderIdentity),
}

impl ChatEvent {
    pub fn sender(&self) -> &SenderIdentity {
        match self {
            ChatEvent::Message(message) => &message.sender,
            ChatEvent::TypingStart(sender) | ChatEvent::TypingStop(sender) => sender,
        }
    }

    /// Typing events are never persisted.
    pub fn is_ephemeral(&self) -> bool {
        !matches!(self, ChatEvent::Message(_))
    }
}

/// Protocol-level failures. Invalid frames are dropped at the transport
/// boundary, never patched into shape.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown frame type `{0}`")]
    UnknownType(String),
    #[error("message frame has no text")]
    MissingText,
    #[error("frame has no sender name")]
    MissingName,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
