//! Message Store.
//!
//! Insertion keeps the list sorted by `created_at` so that frames delivered
//! out of order (e.g. a burst replayed after a reconnect) still read
//! chronologically. Messages with equal timestamps keep arrival order.

use std::collections::HashSet;

use racechat_shared::ChatMessage;

/// Ordered, unique-by-id collection of chat messages.
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
    ids: HashSet<String>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message unless its id is already stored.
    ///
    /// Returns `true` if the store changed.
    pub fn insert(&mut self, message: ChatMessage) -> bool {
        if self.ids.contains(&message.id) {
            return false;
        }

        let position = self
            .messages
            .partition_point(|existing| existing.created_at <= message.created_at);
        self.ids.insert(message.id.clone());
        self.messages.insert(position, message);
        true
    }

    /// Remove everything. Returns `true` if the store was non-empty.
    pub fn clear(&mut self) -> bool {
        let changed = !self.messages.is_empty();
        self.messages.clear();
        self.ids.clear();
        changed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in `created_at` order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Owned copy of the current list.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }
}
