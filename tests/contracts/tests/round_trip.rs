//! Send/receive round trips between two real clients on one relay.

use classchat_client::cache::MessageCache;
use classchat_client::relay::RelayTransport;
use classchat_client::{ChatSession, ConnectionState, Profile};
use classchat_contracts::{wait_until, TestRelay};
use classchat_relay::storage::{MessageStore, SqliteMessageStore};
use std::sync::Arc;

fn session(relay: &TestRelay, name: &str, dir: &tempfile::TempDir) -> ChatSession {
    let transport = Arc::new(RelayTransport::connect(relay.ws_url()));
    ChatSession::start(
        Profile::new(name, "data:,"),
        transport,
        MessageCache::on_disk(&dir.path().join(name)),
    )
}

async fn wait_connected(session: &ChatSession) {
    wait_until("session to connect", || {
        session.connection_state() == ConnectionState::Connected
    })
    .await;
}

#[tokio::test]
async fn message_reaches_the_other_client_exactly_once_each() {
    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::in_memory().unwrap());
    let relay = TestRelay::spawn_quiet(store).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let alice = session(&relay, "alice", &dir);
    let bob = session(&relay, "bob", &dir);
    wait_connected(&alice).await;
    wait_connected(&bob).await;

    alice.send_message("hello").await.unwrap();

    wait_until("bob to receive the message", || {
        bob.messages().iter().any(|m| m.text == "hello")
    })
    .await;

    let received = bob.messages();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].sender.name, "alice");

    // Alice's own echo must not duplicate her optimistic entry.
    wait_until("alice to receive her echo", || {
        // The echo carries the relay-normalized timestamp; id is unchanged.
        alice.messages().len() == 1
    })
    .await;
    let own: Vec<_> = alice
        .messages()
        .iter()
        .filter(|m| m.text == "hello")
        .cloned()
        .collect();
    assert_eq!(own.len(), 1);
}

#[tokio::test]
async fn relay_preserves_send_order() {
    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::in_memory().unwrap());
    let relay = TestRelay::spawn_quiet(Arc::clone(&store)).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let alice = session(&relay, "alice", &dir);
    let bob = session(&relay, "bob", &dir);
    wait_connected(&alice).await;
    wait_connected(&bob).await;

    for text in ["one", "two", "three"] {
        alice.send_message(text).await.unwrap();
    }

    wait_until("bob to receive all three", || bob.messages().len() == 3).await;
    let order: Vec<_> = bob.messages().iter().map(|m| m.text.clone()).collect();
    assert_eq!(order, ["one", "two", "three"]);

    // The persisted order matches what was broadcast.
    let rows = store.recent(10).await.unwrap();
    let stored: Vec<_> = rows
        .iter()
        .filter(|r| r.name == "alice")
        .map(|r| r.text.as_str())
        .collect();
    assert_eq!(stored, ["one", "two", "three"]);
}

#[tokio::test]
async fn redelivered_frames_render_once() {
    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;

    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::in_memory().unwrap());
    let relay = TestRelay::spawn_quiet(store).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let bob = session(&relay, "bob", &dir);
    wait_connected(&bob).await;

    // A raw sender replays the identical frame, same id, three times.
    let (mut raw, _) = tokio_tungstenite::connect_async(relay.ws_url())
        .await
        .unwrap();
    let frame = r#"{"type":"message","id":"replayed-id","name":"mallory","photoUrl":"","text":"again"}"#;
    for _ in 0..3 {
        raw.send(Message::Text(frame.into())).await.unwrap();
    }

    wait_until("bob to receive the replayed message", || {
        bob.messages().iter().any(|m| m.text == "again")
    })
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let matching: Vec<_> = bob
        .messages()
        .into_iter()
        .filter(|m| m.text == "again")
        .collect();
    assert_eq!(matching.len(), 1);
}
