//! Reconciliation of transport updates into the on-screen lists.
//!
//! This is the single place where incoming events become the rendered
//! message list and the typing-indicator list, whichever transport they
//! arrived through. Because the sender's own broadcast comes back over the
//! relay, de-duplication on the event id is what keeps an optimistically
//! rendered message from appearing twice; there is no separate
//! pending-versus-confirmed render state.

use crate::transport::TransportUpdate;
use classchat_protocol::{ChatEvent, EventId, MessageEvent, SenderIdentity};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

/// A typing entry expires this long after the last typing-start, whether or
/// not an explicit stop ever arrives.
pub const TYPING_EXPIRY: Duration = Duration::from_secs(3);

/// One remote sender currently typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingState {
    pub name: String,
    pub photo_url: String,
}

#[derive(Debug)]
struct TypingEntry {
    photo_url: String,
    deadline: Instant,
}

/// The authoritative client-side view of the conversation.
#[derive(Debug, Default)]
pub struct ChatView {
    messages: Vec<MessageEvent>,
    seen: HashSet<EventId>,
    /// Ids hidden locally. Kept separately from the message list so a
    /// snapshot replacement does not resurrect them mid-session.
    hidden: HashSet<EventId>,
    typing: HashMap<String, TypingEntry>,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one transport update into the view.
    pub fn apply(&mut self, update: TransportUpdate) {
        match update {
            TransportUpdate::Event(ChatEvent::Message(message)) => self.push_message(message),
            TransportUpdate::Event(ChatEvent::TypingStart(sender)) => self.typing_started(sender),
            TransportUpdate::Event(ChatEvent::TypingStop(sender)) => self.typing_stopped(&sender),
            TransportUpdate::Snapshot(messages) => self.replace_all(messages),
            TransportUpdate::State(_) => {}
        }
    }

    /// Append one message unless its id has been seen before. Events without
    /// an id never reach a client over either transport; one that does is
    /// dropped rather than rendered un-deduplicatable.
    pub fn push_message(&mut self, message: MessageEvent) {
        let Some(id) = message.id.clone() else {
            return;
        };
        if !self.seen.insert(id) {
            return;
        }
        self.messages.push(message);
    }

    /// List-replace path for snapshot-based transports and history seeding.
    /// The incoming list is taken as already ordered.
    pub fn replace_all(&mut self, messages: Vec<MessageEvent>) {
        self.messages = messages
            .into_iter()
            .filter(|message| message.id.is_some())
            .collect();
        self.seen = self
            .messages
            .iter()
            .filter_map(|message| message.id.clone())
            .collect();
        for message in &mut self.messages {
            if let Some(id) = &message.id {
                if self.hidden.contains(id) {
                    message.soft_deleted = true;
                }
            }
        }
    }

    /// Hide a message from this view only. Nothing is transmitted; every
    /// other client keeps seeing the message.
    pub fn soft_delete(&mut self, id: &EventId) {
        self.hidden.insert(id.clone());
        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|message| message.id.as_ref() == Some(id))
        {
            message.soft_deleted = true;
        }
    }

    pub fn typing_started(&mut self, sender: SenderIdentity) {
        self.typing.insert(
            sender.name,
            TypingEntry {
                photo_url: sender.photo_url,
                deadline: Instant::now() + TYPING_EXPIRY,
            },
        );
    }

    /// An explicit stop removes the entry immediately.
    pub fn typing_stopped(&mut self, sender: &SenderIdentity) {
        self.typing.remove(&sender.name);
    }

    /// Everything in delivery order, including soft-deleted entries.
    pub fn messages(&self) -> &[MessageEvent] {
        &self.messages
    }

    /// The rendered list: delivery order, minus locally hidden entries.
    pub fn visible_messages(&self) -> Vec<MessageEvent> {
        self.messages
            .iter()
            .filter(|message| !message.soft_deleted)
            .cloned()
            .collect()
    }

    /// Senders currently typing; entries past their deadline are pruned
    /// here rather than by a background task.
    pub fn typing(&mut self) -> Vec<TypingState> {
        let now = Instant::now();
        self.typing.retain(|_, entry| entry.deadline > now);
        let mut states: Vec<_> = self
            .typing
            .iter()
            .map(|(name, entry)| TypingState {
                name: name.clone(),
                photo_url: entry.photo_url.clone(),
            })
            .collect();
        states.sort_by(|a, b| a.name.cmp(&b.name));
        states
    }
}
