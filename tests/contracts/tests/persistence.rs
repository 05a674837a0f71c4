//! Persistence policies: persist-before-broadcast, and broadcast even when
//! persistence fails.

use classchat_client::cache::MessageCache;
use classchat_client::relay::RelayTransport;
use classchat_client::{ChatSession, ConnectionState, Profile};
use classchat_contracts::{wait_until, FailingStore, TestRelay};
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
async fn broadcast_still_happens_when_persistence_fails() {
    let relay = TestRelay::spawn(Arc::new(FailingStore)).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let alice = session(&relay, "alice", &dir);
    let bob = session(&relay, "bob", &dir);
    wait_connected(&alice).await;
    wait_connected(&bob).await;

    alice.send_message("still here").await.unwrap();

    wait_until("bob to receive despite storage failure", || {
        bob.messages().iter().any(|m| m.text == "still here")
    })
    .await;
}

#[tokio::test]
async fn message_is_persisted_before_the_broadcast_arrives() {
    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::in_memory().unwrap());
    let relay = TestRelay::spawn_quiet(Arc::clone(&store))
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let alice = session(&relay, "alice", &dir);
    let bob = session(&relay, "bob", &dir);
    wait_connected(&alice).await;
    wait_connected(&bob).await;

    alice.send_message("durable first").await.unwrap();
    wait_until("bob to receive", || {
        bob.messages().iter().any(|m| m.text == "durable first")
    })
    .await;

    // The broadcast reached a peer, so the row must already be durable.
    let rows = store.recent(10).await.unwrap();
    assert!(rows.iter().any(|row| row.text == "durable first"));
}

#[tokio::test]
async fn history_endpoint_serves_persisted_messages_oldest_first() {
    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::in_memory().unwrap());
    let relay = TestRelay::spawn_quiet(Arc::clone(&store))
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let alice = session(&relay, "alice", &dir);
    wait_connected(&alice).await;
    for text in ["first", "second", "third"] {
        alice.send_message(text).await.unwrap();
    }
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while store.recent(50).await.unwrap().len() < 4 {
        assert!(tokio::time::Instant::now() < deadline, "messages never persisted");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    // A fresh client seeds from the HTTP side-channel.
    let late = session(&relay, "late", &dir);
    late.load_history(&relay.http_url(), 50).await.unwrap();

    let texts: Vec<_> = late
        .messages()
        .iter()
        .filter(|m| m.sender.name == "alice")
        .map(|m| m.text.clone())
        .collect();
    assert_eq!(texts, ["first", "second", "third"]);
}
