//! Models for the HTTP history side-channel.
//!
//! A freshly connecting client seeds its message list with a single
//! `GET /api/chat/messages?limit=N` request before any socket traffic;
//! the same shapes describe rows in the relay's message table.

use crate::{EventId, MessageEvent, SenderIdentity};
use serde::{Deserialize, Serialize};

/// One persisted message as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    /// The event id the message carried on the wire.
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub photo_url: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Relay-assigned epoch millis.
    pub timestamp: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

impl HistoryMessage {
    /// Map a history row back into the client-side event shape
    /// (`externalId` becomes the de-duplication id).
    pub fn into_event(self) -> MessageEvent {
        MessageEvent {
            id: Some(EventId::from(self.external_id)),
            sender: SenderIdentity::new(self.name, self.photo_url),
            text: self.text,
            image: self.image,
            timestamp_ms: Some(self.timestamp),
            soft_deleted: false,
        }
    }
}
