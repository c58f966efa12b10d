// Chat synchronization subsystem.
//
// One ChatClient per session. Two data sources feed it: the REST snapshot
// fetches and the push stream. Both re-enter through the ClientEvent channel
// so every mutation happens in handle_event, one event at a time, in arrival
// order. No store mutates another store's state; the cross-store effects of
// a chat message are the router's fixed two-step sequence.

pub mod connection;
pub mod contacts;
pub mod conversation;
pub mod events;
pub mod rest;
pub mod typing;

pub use events::{ChatError, Envelope, EventRouter, OutboundEnvelope};

use anyhow::Result;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::models::{ConnectionState, Contact, Message};
use connection::ConnectionManager;
use contacts::ContactDirectory;
use conversation::ConversationStore;
use rest::RestApi;
use typing::TypingTracker;

/// Everything the dispatch loop can observe. Push frames, REST completions
/// and connection lifecycle all become ClientEvents so that they apply at a
/// single synchronous boundary.
#[derive(Debug)]
pub enum ClientEvent {
    /// Raw frame from the push channel, not yet classified.
    Push(String),
    /// The initial contact snapshot finished loading.
    ContactsLoaded(Vec<Contact>),
    /// A history fetch finished. Tagged with the peer it was issued for so a
    /// late response for a stale selection can be discarded.
    HistoryLoaded { peer_id: i64, messages: Vec<Message> },
    /// The server confirmed a REST send; carries the server-assigned record.
    MessageSent(Message),
    /// The push channel dropped unexpectedly.
    ConnectionClosed,
}

pub struct ChatClient {
    user_id: i64,
    api: RestApi,
    router: EventRouter,
    connection: ConnectionManager,
    conversation: ConversationStore,
    contacts: ContactDirectory,
    typing: TypingTracker,
    event_tx: mpsc::Sender<ClientEvent>,
}

impl ChatClient {
    pub fn new(user_id: i64, api: RestApi) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (event_tx, event_rx) = mpsc::channel(100);
        (
            ChatClient {
                user_id,
                api,
                router: EventRouter::new(user_id),
                connection: ConnectionManager::new(),
                conversation: ConversationStore::new(),
                contacts: ContactDirectory::new(),
                typing: TypingTracker::new(),
                event_tx,
            },
            event_rx,
        )
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn contacts(&self) -> &ContactDirectory {
        &self.contacts
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Clone of the event sender, for anything that needs to feed the
    /// dispatch loop.
    pub fn event_sender(&self) -> mpsc::Sender<ClientEvent> {
        self.event_tx.clone()
    }

    /// Session start: kick off the contact snapshot fetch and open the push
    /// connection. The snapshot loads concurrently with the connect and
    /// re-enters through the dispatch loop.
    pub async fn start(&mut self, ws_base: &str) -> Result<()> {
        self.spawn_contacts_fetch();
        self.connection
            .connect(ws_base, self.user_id, self.event_tx.clone())
            .await
    }

    fn spawn_contacts_fetch(&self) {
        let api = self.api.clone();
        let event_tx = self.event_tx.clone();
        let user_id = self.user_id;
        tokio::spawn(async move {
            match api.fetch_contacts(user_id).await {
                Ok(contacts) => {
                    let _ = event_tx.send(ClientEvent::ContactsLoaded(contacts)).await;
                }
                Err(e) => {
                    // Recovered locally: the directory stays empty.
                    error!("Failed to load contact snapshot: {}", e);
                }
            }
        });
    }

    /// The single state-update boundary. Applies one event to completion
    /// before the caller dequeues the next.
    pub fn handle_event(&mut self, event: ClientEvent, now: Instant) {
        match event {
            ClientEvent::Push(raw) => {
                self.router.dispatch(
                    &raw,
                    &mut self.conversation,
                    &mut self.contacts,
                    &mut self.typing,
                    now,
                );
            }
            ClientEvent::ContactsLoaded(contacts) => {
                self.contacts.load_snapshot(contacts);
            }
            ClientEvent::HistoryLoaded { peer_id, messages } => {
                self.conversation.replace(peer_id, messages);
            }
            ClientEvent::MessageSent(message) => {
                // Optimistic append: the push echo of the same message, if
                // any, dedups against this entry. If the selection moved on
                // while the send was in flight, the confirmation is dropped
                // like any other stale completion.
                let peer_id = if message.sender_id == self.user_id {
                    message.receiver_id
                } else {
                    message.sender_id
                };
                if self.conversation.active_peer() == Some(peer_id) {
                    self.conversation.append(message);
                } else {
                    debug!("Send confirmation for peer {} arrived after switching away", peer_id);
                }
            }
            ClientEvent::ConnectionClosed => {
                self.connection.mark_closed();
            }
        }
    }

    /// Open a peer's conversation: discard the old sequence, clear the unread
    /// flag, and fetch history in the background.
    pub fn select_contact(&mut self, peer_id: i64) {
        self.conversation.select(peer_id);
        self.contacts.mark_read(peer_id);

        let api = self.api.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let messages = match api.fetch_history(peer_id).await {
                Ok(messages) => messages,
                Err(e) => {
                    // Falls back to an empty conversation, indistinguishable
                    // from "no messages yet".
                    error!("Failed to load history for peer {}: {}", peer_id, e);
                    Vec::new()
                }
            };
            let _ = event_tx
                .send(ClientEvent::HistoryLoaded { peer_id, messages })
                .await;
        });
    }

    /// Send a message to the active peer. Clears our own typing signal first,
    /// then performs the REST send; the confirmed message re-enters through
    /// the dispatch loop.
    pub fn send_message(&mut self, content: &str) {
        let Some(peer_id) = self.conversation.active_peer() else {
            warn!("No conversation selected, dropping outgoing message");
            return;
        };

        if let Some(stop) = self.typing.message_sent() {
            self.connection.send(stop);
        }

        let api = self.api.clone();
        let event_tx = self.event_tx.clone();
        let user_id = self.user_id;
        let content = content.to_string();
        tokio::spawn(async move {
            match api.send_message(user_id, peer_id, &content).await {
                Ok(message) => {
                    let _ = event_tx.send(ClientEvent::MessageSent(message)).await;
                }
                Err(e) => {
                    error!("Failed to send message to peer {}: {}", peer_id, e);
                }
            }
        });
    }

    /// Local keystroke in the active conversation; drives the outbound typing
    /// debounce.
    pub fn keystroke(&mut self, now: Instant) {
        let Some(peer_id) = self.conversation.active_peer() else {
            return;
        };
        for envelope in self.typing.note_keystroke(peer_id, now) {
            self.connection.send(envelope);
        }
    }

    /// Periodic housekeeping: flush the debounced stop signal and expire
    /// stale inbound typing flags.
    pub fn tick(&mut self, now: Instant) {
        for envelope in self.typing.poll(now) {
            self.connection.send(envelope);
        }
        for peer_id in self.typing.expire_stale(now) {
            debug!("Clearing expired typing flag for peer {}", peer_id);
            self.contacts.set_typing(peer_id, false);
        }
    }

    /// Session teardown: close the connection and release the typing timers.
    /// Idempotent; nothing fires into torn-down state afterwards.
    pub fn shutdown(&mut self) {
        info!("Shutting down chat client for user {}", self.user_id);
        self.connection.close();
        self.typing.reset();
    }
}
