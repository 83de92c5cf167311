//! Conversation types and the observable transcript store
//!
//! The store owns the ordered transcript and the pending input line. It is
//! the only place either can change, and every change is announced to
//! subscribers synchronously once the change is visible.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("you"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// A change that has just been applied to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Appended(Message),
    PendingInputChanged(String),
}

/// Point-in-time copy of everything a display needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscriptSnapshot {
    pub messages: Vec<Message>,
    pub pending_input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Default)]
struct Inner {
    messages: Vec<Message>,
    pending_input: String,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

/// Append-only transcript plus the unsent input line
#[derive(Default)]
pub struct TranscriptStore {
    inner: Mutex<Inner>,
    listeners: Mutex<Listeners>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the end of the transcript
    pub fn append(&self, message: Message) {
        self.state().messages.push(message.clone());
        self.notify(&StoreEvent::Appended(message));
    }

    /// Replace the pending input. Validation belongs to the caller.
    pub fn set_pending_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.state().pending_input = text.clone();
        self.notify(&StoreEvent::PendingInputChanged(text));
    }

    pub fn clear_pending_input(&self) {
        self.set_pending_input(String::new());
    }

    /// Move the pending input into the transcript as a user message
    ///
    /// The check, the append and the clear happen under one lock, so two
    /// callers can never both take the same line. Returns `None` (and leaves
    /// the input untouched) when `accept` rejects it.
    pub fn take_pending_input(&self, accept: impl FnOnce(&str) -> bool) -> Option<String> {
        let text = {
            let mut inner = self.state();
            if !accept(&inner.pending_input) {
                return None;
            }
            let text = std::mem::take(&mut inner.pending_input);
            inner.messages.push(Message::user(text.clone()));
            text
        };

        self.notify(&StoreEvent::Appended(Message::user(text.clone())));
        self.notify(&StoreEvent::PendingInputChanged(String::new()));
        Some(text)
    }

    pub fn pending_input(&self) -> String {
        self.state().pending_input.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.state().messages.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.state().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        let inner = self.state();
        TranscriptSnapshot {
            messages: inner.messages.clone(),
            pending_input: inner.pending_input.clone(),
        }
    }

    /// Register a listener that runs after every mutation
    ///
    /// Listeners are called on the mutating thread with no store lock held,
    /// so they may read from (or even mutate) the store.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let mut listeners = self.registry();
        let id = SubscriptionId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, listener));
        id
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.registry();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry, _)| *entry != id);
        listeners.entries.len() != before
    }

    fn notify(&self, event: &StoreEvent) {
        let listeners: Vec<Listener> = self
            .registry()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn registry(&self) -> MutexGuard<'_, Listeners> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for TranscriptStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.state();
        f.debug_struct("TranscriptStore")
            .field("messages", &inner.messages.len())
            .field("pending_input", &inner.pending_input)
            .finish()
    }
}
