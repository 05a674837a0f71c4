//! Best-effort local cache of the recent message tail.
//!
//! After every list mutation the newest messages are written to durable
//! local storage so a reload starts with something on screen. The cache is
//! never the source of truth: a failed write costs nothing but the warm
//! start, so every failure path here ends in a log line, not an error.

use classchat_protocol::MessageEvent;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How many messages the cache keeps on a healthy write.
pub const CACHE_TAIL: usize = 20;

/// The smaller tail retried after a quota failure.
pub const CACHE_TAIL_FALLBACK: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("storage quota exceeded")]
    Quota,
    #[error("cache io error: {0}")]
    Io(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Raw storage under the cache; a trait so the quota-recovery path can be
/// exercised without filling a disk.
pub trait CacheBackend: Send + Sync {
    fn write(&self, payload: &str) -> CacheResult<()>;
    fn read(&self) -> CacheResult<Option<String>>;
    fn clear(&self) -> CacheResult<()>;
}

/// File-backed cache storage.
pub struct FsCacheBackend {
    path: PathBuf,
}

impl FsCacheBackend {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("chat-cache.json"),
        }
    }
}

fn io_err(err: std::io::Error) -> CacheError {
    if err.kind() == ErrorKind::StorageFull {
        CacheError::Quota
    } else {
        CacheError::Io(err.to_string())
    }
}

impl CacheBackend for FsCacheBackend {
    fn write(&self, payload: &str) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, payload).map_err(io_err)
    }

    fn read(&self) -> CacheResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(err)),
        }
    }

    fn clear(&self) -> CacheResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(err)),
        }
    }
}

pub struct MessageCache {
    backend: Box<dyn CacheBackend>,
}

impl MessageCache {
    pub fn new(backend: Box<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn on_disk(data_dir: &Path) -> Self {
        Self::new(Box::new(FsCacheBackend::new(data_dir)))
    }

    /// Write the newest tail of `messages`. On a quota failure, clear the
    /// stored data and retry with a much smaller tail; if that also fails,
    /// give up silently. The in-memory list is unaffected either way.
    pub fn store_tail(&self, messages: &[MessageEvent]) {
        match self.try_store(messages, CACHE_TAIL) {
            Ok(()) => {}
            Err(CacheError::Quota) => {
                if let Err(err) = self.backend.clear() {
                    debug!(%err, "cache clear after quota failure failed");
                    return;
                }
                if let Err(err) = self.try_store(messages, CACHE_TAIL_FALLBACK) {
                    debug!(%err, "cache write failed after quota recovery");
                }
            }
            Err(err) => debug!(%err, "cache write failed"),
        }
    }

    fn try_store(&self, messages: &[MessageEvent], tail: usize) -> CacheResult<()> {
        let start = messages.len().saturating_sub(tail);
        let payload = serde_json::to_string(&messages[start..])
            .map_err(|err| CacheError::Io(err.to_string()))?;
        self.backend.write(&payload)
    }

    /// Whatever tail survived the last run; empty on any problem.
    pub fn load(&self) -> Vec<MessageEvent> {
        let payload = match self.backend.read() {
            Ok(Some(payload)) => payload,
            Ok(None) => return Vec::new(),
            Err(err) => {
                debug!(%err, "cache read failed");
                return Vec::new();
            }
        };
        serde_json::from_str(&payload).unwrap_or_default()
    }
}
