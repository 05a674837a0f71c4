//! Message persistence for the relay.
//!
//! Only `message`-kind events are ever stored; typing events pass straight
//! through the broadcast path. The store is behind a trait so the contract
//! tests can swap in a failing double and pin the broadcast-on-failure
//! policy.

mod sqlite;

pub use sqlite::SqliteMessageStore;

use async_trait::async_trait;
use classchat_protocol::history::HistoryMessage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Column values for a newly persisted message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub external_id: String,
    pub name: String,
    pub photo_url: String,
    pub text: String,
    pub image: Option<String>,
    pub timestamp_ms: i64,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably store one message. The caller awaits this before broadcasting
    /// so a crash between the two loses delivery, never the message.
    async fn persist(&self, message: NewMessage) -> StorageResult<HistoryMessage>;

    /// The most recent non-deleted messages, oldest first.
    async fn recent(&self, limit: usize) -> StorageResult<Vec<HistoryMessage>>;

    /// Whether `name` persisted a message with exactly this text at or after
    /// `since_ms`. Used for the welcome de-duplication check.
    async fn has_recent_message(
        &self,
        name: &str,
        text: &str,
        since_ms: i64,
    ) -> StorageResult<bool>;
}
