//! Wire codec for the relay socket: one JSON object per frame.
//!
//! The frame shape is tolerant for the sake of legacy senders (`type` is
//! implied `"message"`, `id` and `timestamp` may be absent), but conversion
//! into [`ChatEvent`] validates and fails closed: an invalid frame is an
//! error for the caller to drop and log, not something to patch in place.

use crate::{ChatEvent, EventId, MessageEvent, ProtocolError, Result, SenderIdentity};
use serde::{Deserialize, Serialize};

pub const TYPE_MESSAGE: &str = "message";
pub const TYPE_TYPING: &str = "typing";
pub const TYPE_STOP_TYPING: &str = "stopTyping";

/// Raw frame shape as it appears on the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFrame {
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

fn default_type() -> String {
    TYPE_MESSAGE.to_string()
}

/// Legacy senders wrote timestamps as strings; the relay writes epoch millis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Timestamp::Millis(ms) => Some(*ms),
            Timestamp::Text(text) => text.parse().ok(),
        }
    }
}

/// Parse one socket frame into a validated event.
pub fn decode(raw: &str) -> Result<ChatEvent> {
    let frame: WireFrame = serde_json::from_str(raw)?;
    ChatEvent::from_wire(frame)
}

/// Serialize an event as one socket frame.
pub fn encode(event: &ChatEvent) -> String {
    let frame = event.to_wire();
    // WireFrame is plain data; serialization cannot fail.
    serde_json::to_string(&frame).unwrap_or_default()
}

impl ChatEvent {
    pub fn from_wire(frame: WireFrame) -> Result<Self> {
        if frame.name.trim().is_empty() {
            return Err(ProtocolError::MissingName);
        }
        let sender = SenderIdentity::new(frame.name, frame.photo_url);
        match frame.kind.as_str() {
            TYPE_MESSAGE => {
                let text = frame.text.ok_or(ProtocolError::MissingText)?;
                Ok(ChatEvent::Message(MessageEvent {
                    id: frame.id.map(EventId::from),
                    sender,
                    text,
                    image: frame.image,
                    timestamp_ms: frame.timestamp.and_then(|ts| ts.as_millis()),
                    soft_deleted: false,
                }))
            }
            TYPE_TYPING => Ok(ChatEvent::TypingStart(sender)),
            TYPE_STOP_TYPING => Ok(ChatEvent::TypingStop(sender)),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }

    pub fn to_wire(&self) -> WireFrame {
        match self {
            ChatEvent::Message(message) => WireFrame {
                kind: TYPE_MESSAGE.to_string(),
                id: message.id.as_ref().map(|id| id.0.clone()),
                name: message.sender.name.clone(),
                photo_url: message.sender.photo_url.clone(),
                text: Some(message.text.clone()),
                image: message.image.clone(),
                timestamp: message.timestamp_ms.map(Timestamp::Millis),
            },
            ChatEvent::TypingStart(sender) => typing_frame(TYPE_TYPING, sender),
            ChatEvent::TypingStop(sender) => typing_frame(TYPE_STOP_TYPING, sender),
        }
    }
}

fn typing_frame(kind: &str, sender: &SenderIdentity) -> WireFrame {
    WireFrame {
        kind: kind.to_string(),
        id: None,
        name: sender.name.clone(),
        photo_url: sender.photo_url.clone(),
        text: None,
        image: None,
        timestamp: None,
    }
}
