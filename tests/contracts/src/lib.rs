//! Test harness for the contract suite: a real relay on an ephemeral port,
//! plus store doubles for pinning the failure policies.

use async_trait::async_trait;
use classchat_protocol::history::HistoryMessage;
use classchat_protocol::now_ms;
use classchat_relay::storage::{MessageStore, NewMessage, StorageError, StorageResult};
use classchat_relay::ws::CHAT_WS_PATH;
use classchat_relay::{router, AppConfig, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEST_WELCOME_TEXT: &str = "Welcome to the class chat!";
pub const TEST_WELCOME_SENDER: &str = "ClassBot";

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        db_path: ":memory:".to_string(),
        welcome_sender: TEST_WELCOME_SENDER.to_string(),
        welcome_photo_url: String::new(),
        welcome_text: TEST_WELCOME_TEXT.to_string(),
        welcome_window_ms: 60_000,
        history_limit: 50,
    }
}

/// A relay serving on an ephemeral local port for the duration of a test.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    server_task: JoinHandle<()>,
}

impl TestRelay {
    pub async fn spawn(store: Arc<dyn MessageStore>) -> anyhow::Result<Self> {
        let state = AppState::new(test_config(), store);
        let app = router(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server_task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server_task,
        })
    }

    /// Spawn with the welcome already persisted so it does not show up in
    /// the traffic a test is asserting on.
    pub async fn spawn_quiet(store: Arc<dyn MessageStore>) -> anyhow::Result<Self> {
        store
            .persist(NewMessage {
                external_id: format!("welcome-{}", now_ms()),
                name: TEST_WELCOME_SENDER.to_string(),
                photo_url: String::new(),
                text: TEST_WELCOME_TEXT.to_string(),
                image: None,
                timestamp_ms: now_ms(),
            })
            .await
            .map_err(|err| anyhow::anyhow!("failed to seed welcome: {err}"))?;
        Self::spawn(store).await
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.addr, CHAT_WS_PATH)
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}

/// Store double whose writes always fail; reads behave as an empty store
/// and the welcome check reports a recent welcome so none is generated.
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn persist(&self, _message: NewMessage) -> StorageResult<HistoryMessage> {
        Err(StorageError::Unavailable("injected failure".to_string()))
    }

    async fn recent(&self, _limit: usize) -> StorageResult<Vec<HistoryMessage>> {
        Ok(Vec::new())
    }

    async fn has_recent_message(
        &self,
        _name: &str,
        _text: &str,
        _since_ms: i64,
    ) -> StorageResult<bool> {
        Ok(true)
    }
}

/// Poll `condition` until it holds or the timeout elapses.
pub async fn wait_until<F: FnMut() -> bool>(what: &str, mut condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
