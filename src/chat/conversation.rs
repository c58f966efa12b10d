// Conversation Store: the ordered, deduplicated message sequence for the
// currently selected peer.
//
// Two unordered sources feed it, a REST history fetch and the push stream,
// and either may win the race. Dedup by id makes the merge safe regardless
// of which completes first.

use log::debug;

use crate::models::Message;

pub struct ConversationStore {
    active_peer: Option<i64>,
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        ConversationStore {
            active_peer: None,
            messages: Vec::new(),
        }
    }

    pub fn active_peer(&self) -> Option<i64> {
        self.active_peer
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Switch the conversation to `peer_id`, discarding the previous
    /// sequence. History for the new peer arrives later via `replace`.
    pub fn select(&mut self, peer_id: i64) {
        self.active_peer = Some(peer_id);
        self.messages.clear();
    }

    /// Drop the selection entirely (no conversation open).
    pub fn clear_selection(&mut self) {
        self.active_peer = None;
        self.messages.clear();
    }

    /// Apply a fetched history for `peer_id`. A response for a peer that is
    /// no longer the active selection is stale and must be discarded, not
    /// applied.
    pub fn replace(&mut self, peer_id: i64, history: Vec<Message>) {
        if self.active_peer != Some(peer_id) {
            debug!(
                "Discarding stale history for peer {} (selection moved on)",
                peer_id
            );
            return;
        }
        // The push stream may already have appended messages that the fetch
        // also contains; run everything through append so dedup and ordering
        // hold either way.
        let live = std::mem::take(&mut self.messages);
        for message in history {
            self.append(message);
        }
        for message in live {
            self.append(message);
        }
    }

    /// Insert a message unless its id is already present. Insertion keeps
    /// `created_at` non-decreasing; equal timestamps keep arrival order.
    pub fn append(&mut self, message: Message) {
        if self.messages.iter().any(|m| m.id == message.id) {
            debug!("Skipping duplicate message {}", message.id);
            return;
        }
        let mut idx = self.messages.len();
        while idx > 0 && self.messages[idx - 1].created_at > message.created_at {
            idx -= 1;
        }
        self.messages.insert(idx, message);
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
