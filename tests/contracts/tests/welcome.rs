//! Welcome-message behavior on fresh connections.

use classchat_contracts::{TestRelay, TEST_WELCOME_SENDER, TEST_WELCOME_TEXT};
use classchat_relay::storage::{MessageStore, SqliteMessageStore};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn two_quick_connections_persist_at_most_one_welcome() {
    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::in_memory().unwrap());
    let relay = TestRelay::spawn(Arc::clone(&store)).await.unwrap();

    let (_first, _) = tokio_tungstenite::connect_async(relay.ws_url())
        .await
        .unwrap();
    // Let the first connection's welcome land, then connect again well
    // inside the dedup window.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while store.recent(10).await.unwrap().is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "first welcome never persisted"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let (_second, _) = tokio_tungstenite::connect_async(relay.ws_url())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let rows = store.recent(10).await.unwrap();
    let welcomes: Vec<_> = rows
        .iter()
        .filter(|row| row.name == TEST_WELCOME_SENDER && row.text == TEST_WELCOME_TEXT)
        .collect();
    assert_eq!(welcomes.len(), 1);
}

#[tokio::test]
async fn welcome_is_broadcast_to_the_open_connection() {
    use futures_util::StreamExt;
    use tokio_tungstenite::tungstenite::Message;

    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::in_memory().unwrap());
    let relay = TestRelay::spawn(store).await.unwrap();

    let (mut client, _) = tokio_tungstenite::connect_async(relay.ws_url())
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("welcome frame in time")
        .expect("stream open")
        .expect("frame ok");

    match frame {
        Message::Text(text) => {
            let event = classchat_protocol::wire::decode(text.as_str()).unwrap();
            match event {
                classchat_protocol::ChatEvent::Message(message) => {
                    assert_eq!(message.sender.name, TEST_WELCOME_SENDER);
                    assert_eq!(message.text, TEST_WELCOME_TEXT);
                    assert!(message.id.is_some());
                }
                other => panic!("expected welcome message, got {other:?}"),
            }
        }
        other => panic!("expected text frame, got {other:?}"),
    }
}
