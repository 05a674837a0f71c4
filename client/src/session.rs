//! Session glue: the local profile, the selected transport, the view, and
//! the cache, wired together for a UI to drive.

use crate::cache::MessageCache;
use crate::profile::Profile;
use crate::transport::{ChatTransport, ConnectionState, TransportError, TransportUpdate};
use crate::view::{ChatView, TypingState};
use classchat_protocol::history::HistoryMessage;
use classchat_protocol::{ChatEvent, EventId, MessageEvent};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

/// A rejected send. The composed text comes back so the UI can restore it
/// into the input field; sends are never retried automatically.
#[derive(Debug, thiserror::Error)]
#[error("message was not sent: {reason}")]
pub struct SendFailure {
    pub text: String,
    #[source]
    pub reason: TransportError,
}

pub struct ChatSession {
    profile: Profile,
    transport: Arc<dyn ChatTransport>,
    view: Arc<Mutex<ChatView>>,
    cache: Arc<MessageCache>,
    update_task: JoinHandle<()>,
}

impl ChatSession {
    /// Wire a session over an already-selected transport. The cached tail
    /// from the previous run seeds the view so a reload starts warm.
    pub fn start(profile: Profile, transport: Arc<dyn ChatTransport>, cache: MessageCache) -> Self {
        let cache = Arc::new(cache);
        let mut view = ChatView::new();
        view.replace_all(cache.load());
        let view = Arc::new(Mutex::new(view));

        let mut updates = transport.updates();
        let task_view = Arc::clone(&view);
        let task_cache = Arc::clone(&cache);
        let update_task = tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => {
                        let mutated = !matches!(update, TransportUpdate::State(_));
                        let mut view = task_view.lock().expect("chat view poisoned");
                        view.apply(update);
                        if mutated {
                            task_cache.store_tail(view.messages());
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "transport updates lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            profile,
            transport,
            view,
            cache,
            update_task,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.connection_state()
    }

    /// Send one message. The id is assigned here, before transmission, so
    /// the relay's echo de-duplicates against the optimistic local entry and
    /// the render model stays a single list.
    pub async fn send_message(&self, text: &str) -> Result<EventId, SendFailure> {
        let message = MessageEvent::compose(self.profile.identity(), text);
        let id = message.id.clone().expect("composed message carries an id");

        match self
            .transport
            .send(ChatEvent::Message(message.clone()))
            .await
        {
            Ok(()) => {
                let mut view = self.view.lock().expect("chat view poisoned");
                view.push_message(message);
                self.cache.store_tail(view.messages());
                Ok(id)
            }
            Err(reason) => Err(SendFailure {
                text: text.to_string(),
                reason,
            }),
        }
    }

    /// Typing notifications are fire-and-forget; a failure costs nothing.
    pub async fn notify_typing_started(&self) {
        let event = ChatEvent::TypingStart(self.profile.identity());
        if let Err(err) = self.transport.send(event).await {
            debug!(%err, "typing-start not sent");
        }
    }

    pub async fn notify_typing_stopped(&self) {
        let event = ChatEvent::TypingStop(self.profile.identity());
        if let Err(err) = self.transport.send(event).await {
            debug!(%err, "typing-stop not sent");
        }
    }

    /// Seed the view from the relay's HTTP side-channel. Called once on page
    /// load, before live events start accumulating.
    pub async fn load_history(&self, http_base_url: &str, limit: usize) -> anyhow::Result<()> {
        let url = format!(
            "{}/api/chat/messages?limit={limit}",
            http_base_url.trim_end_matches('/')
        );
        let rows: Vec<HistoryMessage> = reqwest::get(&url).await?.error_for_status()?.json().await?;

        let messages: Vec<_> = rows.into_iter().map(HistoryMessage::into_event).collect();
        let mut view = self.view.lock().expect("chat view poisoned");
        view.replace_all(messages);
        self.cache.store_tail(view.messages());
        Ok(())
    }

    /// Hide a message from this client's view only.
    pub fn soft_delete(&self, id: &EventId) {
        let mut view = self.view.lock().expect("chat view poisoned");
        view.soft_delete(id);
        self.cache.store_tail(view.messages());
    }

    pub fn messages(&self) -> Vec<MessageEvent> {
        self.view
            .lock()
            .expect("chat view poisoned")
            .visible_messages()
    }

    pub fn typing(&self) -> Vec<TypingState> {
        self.view.lock().expect("chat view poisoned").typing()
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.update_task.abort();
    }
}
