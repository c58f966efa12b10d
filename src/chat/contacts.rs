// Contact Directory: the peer set with presence, unread flags and message
// previews, plus the derived list the user actually sees.

use chrono::NaiveDateTime;
use log::{debug, info};

use crate::models::Contact;

pub struct ContactDirectory {
    // Snapshot order is preserved; it is the tie-breaker for contacts with
    // no messages yet.
    contacts: Vec<Contact>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        ContactDirectory {
            contacts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, peer_id: i64) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == peer_id)
    }

    /// Replace the full set once at session start.
    pub fn load_snapshot(&mut self, contacts: Vec<Contact>) {
        info!("Loaded contact snapshot with {} peers", contacts.len());
        self.contacts = contacts;
    }

    /// Full replace of the derived `online` flags: any peer not listed is
    /// implicitly offline. A dropped presence event therefore leaves at worst
    /// the previous full picture, never partial drift.
    pub fn apply_presence(&mut self, online_ids: &[i64]) {
        for contact in &mut self.contacts {
            contact.online = online_ids.contains(&contact.id);
        }
    }

    pub fn set_typing(&mut self, peer_id: i64, typing: bool) {
        if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == peer_id) {
            contact.typing = typing;
        } else {
            debug!("Typing signal for unknown peer {}", peer_id);
        }
    }

    pub fn set_unread(&mut self, peer_id: i64, unread: bool) {
        if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == peer_id) {
            contact.unread = unread;
        }
    }

    /// Clear the unread flag; invoked when the user opens this peer's
    /// conversation.
    pub fn mark_read(&mut self, peer_id: i64) {
        self.set_unread(peer_id, false);
    }

    /// Record the latest message for ordering and display, independent of
    /// read state.
    pub fn update_preview(&mut self, peer_id: i64, content: &str, at: NaiveDateTime) {
        if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == peer_id) {
            contact.last_message_preview = Some(content.to_string());
            contact.last_message_at = Some(at);
        } else {
            debug!("Message preview for unknown peer {}", peer_id);
        }
    }

    /// The list presented to the user: filtered by a case-insensitive
    /// substring match on the display name, sorted by last message time
    /// descending with message-less contacts last. Pure view, the underlying
    /// set is never mutated.
    pub fn visible(&self, query: &str) -> Vec<&Contact> {
        let needle = query.to_lowercase();
        let mut view: Vec<&Contact> = self
            .contacts
            .iter()
            .filter(|c| needle.is_empty() || c.display_name.to_lowercase().contains(&needle))
            .collect();
        // Option ordering puts None below any Some, so a descending sort on
        // last_message_at lands the no-message contacts at the end. The sort
        // is stable, keeping snapshot order among ties.
        view.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        view
    }
}

impl Default for ContactDirectory {
    fn default() -> Self {
        Self::new()
    }
}
