//! Hosted realtime-database fallback transport.
//!
//! Used when the site is statically hosted and no relay server exists. The
//! hosted service has no concept of deltas: every update is the entire
//! message collection, which this adapter sorts by the service-assigned
//! timestamp and hands to the reconciliation layer as a list replacement.
//! The service's own SDK reconnects transparently, so the transport reports
//! `Connected` for the whole session once it is running.

use crate::transport::{
    ChatTransport, ConnectionState, TransportError, TransportResult, TransportUpdate,
};
use async_trait::async_trait;
use classchat_protocol::{ChatEvent, EventId, MessageEvent, SenderIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// The message collection as the hosted service exposes it: a map of
/// auto-generated child ids to plain records.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_all(&self) -> anyhow::Result<Vec<MessageEvent>>;

    /// Append one message; the service assigns the authoritative timestamp.
    async fn append(&self, message: &MessageEvent) -> anyhow::Result<()>;
}

/// One record under the hosted `messages` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedRecord {
    pub name: String,
    #[serde(default)]
    pub photo_url: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Service-assigned epoch millis; absent only in the instant between a
    /// write and the service stamping it.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl HostedRecord {
    fn into_event(self, child_id: String) -> MessageEvent {
        MessageEvent {
            id: Some(EventId::from(child_id)),
            sender: SenderIdentity::new(self.name, self.photo_url),
            text: self.text,
            image: self.image,
            timestamp_ms: self.timestamp,
            soft_deleted: false,
        }
    }
}

/// REST implementation of [`SnapshotSource`] against a Firebase-style
/// endpoint: `GET {base}/messages.json` returns the child-id-keyed map and
/// `POST {base}/messages.json` appends under a fresh child id. The write
/// carries a server-value placeholder so the timestamp is authoritative even
/// when client clocks are skewed.
pub struct RestSnapshotSource {
    base_url: String,
    http: reqwest::Client,
}

impl RestSnapshotSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/messages.json", self.base_url)
    }
}

#[async_trait]
impl SnapshotSource for RestSnapshotSource {
    async fn fetch_all(&self) -> anyhow::Result<Vec<MessageEvent>> {
        let records: Option<HashMap<String, HostedRecord>> = self
            .http
            .get(self.collection_url())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(records
            .unwrap_or_default()
            .into_iter()
            .map(|(child_id, record)| record.into_event(child_id))
            .collect())
    }

    async fn append(&self, message: &MessageEvent) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "name": message.sender.name,
            "photoUrl": message.sender.photo_url,
            "text": message.text,
            "image": message.image,
            "timestamp": { ".sv": "timestamp" },
        });
        self.http
            .post(self.collection_url())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

pub struct HostedTransport {
    source: Arc<dyn SnapshotSource>,
    updates_tx: broadcast::Sender<TransportUpdate>,
}

impl HostedTransport {
    /// Start polling the hosted collection. Every observed change is
    /// delivered as a full sorted snapshot.
    pub fn start(source: Arc<dyn SnapshotSource>, poll_interval: Duration) -> Self {
        let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        let poll_source = Arc::clone(&source);
        let poll_updates = updates_tx.clone();
        tokio::spawn(async move {
            let mut last_delivered: Vec<Option<EventId>> = Vec::new();
            loop {
                match poll_source.fetch_all().await {
                    Ok(mut snapshot) => {
                        sort_snapshot(&mut snapshot);
                        let ids: Vec<_> = snapshot.iter().map(|m| m.id.clone()).collect();
                        if ids != last_delivered {
                            last_delivered = ids;
                            let _ = poll_updates.send(TransportUpdate::Snapshot(snapshot));
                        }
                    }
                    Err(err) => debug!(%err, "hosted snapshot fetch failed"),
                }
                tokio::time::sleep(poll_interval).await;
            }
        });

        Self { source, updates_tx }
    }
}

/// Order by the service-assigned timestamp, oldest first. The sort is
/// stable, so writes the service's clock resolution cannot distinguish keep
/// their relative order within a snapshot.
fn sort_snapshot(snapshot: &mut [MessageEvent]) {
    snapshot.sort_by_key(|message| message.timestamp_ms.unwrap_or(i64::MAX));
}

#[async_trait]
impl ChatTransport for HostedTransport {
    async fn send(&self, event: ChatEvent) -> TransportResult<()> {
        match event {
            ChatEvent::Message(message) => self
                .source
                .append(&message)
                .await
                .map_err(|err| TransportError::Send(err.to_string())),
            // Typing indicators are not carried over this transport.
            ChatEvent::TypingStart(_) | ChatEvent::TypingStop(_) => Ok(()),
        }
    }

    fn updates(&self) -> broadcast::Receiver<TransportUpdate> {
        self.updates_tx.subscribe()
    }

    /// The hosted SDK reconnects transparently; there is no disconnected
    /// state for the UI to track.
    fn connection_state(&self) -> ConnectionState {
        ConnectionState::Connected
    }
}
