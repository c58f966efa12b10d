// Push channel envelopes and the router that applies them to the stores.
//
// Every inbound frame is classified as exactly one of three kinds; anything
// else is ignored so newer servers can ship event types we do not know yet.

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use super::contacts::ContactDirectory;
use super::conversation::ConversationStore;
use super::typing::TypingTracker;
use crate::models::Message;

/// Failure classes of the sync subsystem.
///
/// None of these may crash the dispatch loop: transport failures fall back to
/// empty results, a lost connection only drifts presence until the next
/// snapshot, and malformed events are dropped on the floor.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("connection lost")]
    ConnectionLost,
    #[error("malformed event: {0}")]
    MalformedEvent(String),
}

/// Inbound envelope, tagged by the `type` field on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Complete snapshot of peer ids currently online, replacing the prior set.
    Presence { online_ids: Vec<i64> },
    /// Point signal, not a snapshot: one peer started or stopped typing.
    Typing { sender_id: i64, is_typing: bool },
    /// A full message payload, possibly an echo of one we already hold.
    ChatMessage {
        id: i64,
        sender_id: i64,
        receiver_id: i64,
        content: String,
        created_at: NaiveDateTime,
        is_read: bool,
    },
}

/// Outbound envelope. Only typing signals go over the push channel; message
/// sends use REST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEnvelope {
    Typing { receiver_id: i64, is_typing: bool },
}

/// Classifies raw push frames and applies them to the stores, one frame at a
/// time in arrival order. The router never reorders or buffers; each frame's
/// effects complete before the next frame is looked at.
pub struct EventRouter {
    user_id: i64,
}

impl EventRouter {
    pub fn new(user_id: i64) -> Self {
        EventRouter { user_id }
    }

    /// Parse one raw frame into an envelope. Unknown `type` values, missing
    /// fields and broken JSON all come back as `MalformedEvent`.
    pub fn parse(raw: &str) -> Result<Envelope, ChatError> {
        serde_json::from_str(raw).map_err(|e| ChatError::MalformedEvent(e.to_string()))
    }

    /// Apply one raw frame. Malformed frames are logged at debug and have no
    /// user-visible effect.
    pub fn dispatch(
        &self,
        raw: &str,
        conversation: &mut ConversationStore,
        contacts: &mut ContactDirectory,
        typing: &mut TypingTracker,
        now: Instant,
    ) {
        let envelope = match Self::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Ignoring unroutable push frame: {}", e);
                return;
            }
        };
        self.apply(envelope, conversation, contacts, typing, now);
    }

    pub fn apply(
        &self,
        envelope: Envelope,
        conversation: &mut ConversationStore,
        contacts: &mut ContactDirectory,
        typing: &mut TypingTracker,
        now: Instant,
    ) {
        match envelope {
            Envelope::Presence { online_ids } => {
                contacts.apply_presence(&online_ids);
            }
            Envelope::Typing {
                sender_id,
                is_typing,
            } => {
                typing.set_remote_typing(sender_id, is_typing, now);
                contacts.set_typing(sender_id, is_typing);
            }
            Envelope::ChatMessage {
                id,
                sender_id,
                receiver_id,
                content,
                created_at,
                is_read,
            } => {
                let message = Message {
                    id,
                    sender_id,
                    receiver_id,
                    content,
                    created_at,
                    is_read,
                };
                // The peer of a message is the other end of it, whichever
                // direction it travelled.
                let peer_id = if message.sender_id == self.user_id {
                    message.receiver_id
                } else {
                    message.sender_id
                };
                let conversation_open = conversation.active_peer() == Some(peer_id);

                // Fixed effect order: Conversation Store first, then the
                // Contact Directory.
                if conversation_open {
                    conversation.append(message.clone());
                }
                contacts.update_preview(peer_id, &message.content, message.created_at);
                if !conversation_open {
                    contacts.set_unread(peer_id, true);
                }
            }
        }
    }
}
