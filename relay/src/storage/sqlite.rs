use super::{MessageStore, NewMessage, StorageError, StorageResult};
use anyhow::Context;
use async_trait::async_trait;
use classchat_protocol::history::HistoryMessage;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

/// SQLite-backed message store.
///
/// A single connection behind an async mutex; queries here are small and
/// index-backed, so serializing them is not a bottleneck at class scale.
pub struct SqliteMessageStore {
    conn: Mutex<Connection>,
}

impl SqliteMessageStore {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open message database at {path}"))?;
        Self::init_schema(&conn).context("failed to initialize message schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::init_schema(&conn).context("failed to initialize message schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                photo_url TEXT NOT NULL DEFAULT '',
                text TEXT NOT NULL,
                image_data TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                timestamp_ms INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp_ms)",
            [],
        )?;
        Ok(())
    }

    #[cfg(test)]
    async fn mark_deleted(&self, external_id: &str) -> StorageResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE messages SET is_deleted = 1 WHERE external_id = ?1",
            params![external_id],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

fn db_err(err: rusqlite::Error) -> StorageError {
    StorageError::Database(err.to_string())
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn persist(&self, message: NewMessage) -> StorageResult<HistoryMessage> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO messages
                 (external_id, name, photo_url, text, image_data, timestamp_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.external_id,
                message.name,
                message.photo_url,
                message.text,
                message.image,
                message.timestamp_ms,
            ],
        )
        .map_err(db_err)?;

        Ok(HistoryMessage {
            external_id: message.external_id,
            name: message.name,
            photo_url: message.photo_url,
            text: message.text,
            image: message.image,
            timestamp: message.timestamp_ms,
            is_deleted: false,
        })
    }

    async fn recent(&self, limit: usize) -> StorageResult<Vec<HistoryMessage>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT external_id, name, photo_url, text, image_data, timestamp_ms
                 FROM messages
                 WHERE is_deleted = 0
                 ORDER BY timestamp_ms DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let mut rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(HistoryMessage {
                    external_id: row.get(0)?,
                    name: row.get(1)?,
                    photo_url: row.get(2)?,
                    text: row.get(3)?,
                    image: row.get(4)?,
                    timestamp: row.get(5)?,
                    is_deleted: false,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        // Query is newest-first for the LIMIT; callers want oldest-first.
        rows.reverse();
        Ok(rows)
    }

    async fn has_recent_message(
        &self,
        name: &str,
        text: &str,
        since_ms: i64,
    ) -> StorageResult<bool> {
        let conn = self.conn.lock().await;
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM messages
                     WHERE name = ?1 AND text = ?2 AND timestamp_ms >= ?3
                 )",
                params![name, text, since_ms],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(exists)
    }
}
