use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One chat message between the user and a single peer.
///
/// Immutable once created; the server assigns `id` and `created_at`. The same
/// id may reach us twice (history fetch plus a late push echo) and must
/// collapse to one entry in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub is_read: bool,
}

/// One entry per peer the user may converse with.
///
/// `online` and `typing` are derived, expiring signals, not persisted facts.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: i64,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<NaiveDateTime>,
    pub unread: bool,
    pub online: bool,
    pub typing: bool,
}

impl Contact {
    pub fn new(id: i64, display_name: &str, avatar_ref: Option<String>) -> Self {
        Contact {
            id,
            display_name: display_name.to_string(),
            avatar_ref,
            last_message_preview: None,
            last_message_at: None,
            unread: false,
            online: false,
            typing: false,
        }
    }
}

/// Lifecycle of the push connection. Exactly one instance per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,       // No connection requested yet
    Connecting, // Dial in progress
    Open,       // Live; sends and typing signals permitted
    Closed,     // Torn down or dropped; no further events fire
}
