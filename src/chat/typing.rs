// Typing Indicator Tracker.
//
// Outbound: a keystroke signals typing immediately; the stop signal is
// debounced and sent only after the keyboard has been quiet for the window,
// or forced when the message is submitted.
//
// Inbound: a peer's typing flag carries no expiry on the wire. The remote
// debounce normally clears it, but the terminal stop signal can be lost, so
// every flag also gets a local deadline as a safety net.
//
// The tracker never touches the connection. Its methods return the envelopes
// to emit and take explicit `now` values, which keeps the whole state machine
// deterministic under test.

use std::collections::HashMap;

use log::debug;
use tokio::time::{Duration, Instant};

use super::events::OutboundEnvelope;

/// Quiet period after the last keystroke before the stop signal goes out.
pub const TYPING_DEBOUNCE: Duration = Duration::from_millis(2000);

/// How long an inbound typing flag may live without a refresh. Sender-side
/// debounce plus margin.
pub const TYPING_EXPIRY: Duration = Duration::from_millis(6000);

struct PendingStop {
    receiver_id: i64,
    deadline: Instant,
}

pub struct TypingTracker {
    pending_stop: Option<PendingStop>,
    remote_deadlines: HashMap<i64, Instant>,
}

impl TypingTracker {
    pub fn new() -> Self {
        TypingTracker {
            pending_stop: None,
            remote_deadlines: HashMap::new(),
        }
    }

    /// Record a local keystroke addressed to `receiver_id`. Emits the start
    /// signal on the first keystroke of a burst; later keystrokes only push
    /// the stop deadline out. Switching conversations mid-burst stops the old
    /// peer's indicator before starting the new one.
    pub fn note_keystroke(&mut self, receiver_id: i64, now: Instant) -> Vec<OutboundEnvelope> {
        let deadline = now + TYPING_DEBOUNCE;
        match &mut self.pending_stop {
            Some(pending) if pending.receiver_id == receiver_id => {
                pending.deadline = deadline;
                Vec::new()
            }
            Some(pending) => {
                let previous = pending.receiver_id;
                pending.receiver_id = receiver_id;
                pending.deadline = deadline;
                vec![
                    OutboundEnvelope::Typing {
                        receiver_id: previous,
                        is_typing: false,
                    },
                    OutboundEnvelope::Typing {
                        receiver_id,
                        is_typing: true,
                    },
                ]
            }
            None => {
                self.pending_stop = Some(PendingStop {
                    receiver_id,
                    deadline,
                });
                vec![OutboundEnvelope::Typing {
                    receiver_id,
                    is_typing: true,
                }]
            }
        }
    }

    /// Emit the deferred stop signal once the debounce window has lapsed.
    pub fn poll(&mut self, now: Instant) -> Vec<OutboundEnvelope> {
        if let Some(pending) = &self.pending_stop {
            if now >= pending.deadline {
                let receiver_id = pending.receiver_id;
                self.pending_stop = None;
                return vec![OutboundEnvelope::Typing {
                    receiver_id,
                    is_typing: false,
                }];
            }
        }
        Vec::new()
    }

    /// Submitting a message cancels the pending debounce and forces the stop
    /// signal immediately, so a send always clears our own typing state.
    pub fn message_sent(&mut self) -> Option<OutboundEnvelope> {
        self.pending_stop.take().map(|pending| OutboundEnvelope::Typing {
            receiver_id: pending.receiver_id,
            is_typing: false,
        })
    }

    /// Arm or disarm the expiry deadline for a peer's inbound typing flag.
    pub fn set_remote_typing(&mut self, peer_id: i64, is_typing: bool, now: Instant) {
        if is_typing {
            self.remote_deadlines.insert(peer_id, now + TYPING_EXPIRY);
        } else {
            self.remote_deadlines.remove(&peer_id);
        }
    }

    pub fn is_remote_typing(&self, peer_id: i64) -> bool {
        self.remote_deadlines.contains_key(&peer_id)
    }

    /// Clear flags whose deadline has passed and return the affected peers so
    /// the directory can be updated to match.
    pub fn expire_stale(&mut self, now: Instant) -> Vec<i64> {
        let expired: Vec<i64> = self
            .remote_deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(peer_id, _)| *peer_id)
            .collect();
        for peer_id in &expired {
            self.remote_deadlines.remove(peer_id);
            debug!("Expiring stale typing flag for peer {}", peer_id);
        }
        expired
    }

    /// Drop all timers. A poll after reset emits nothing; used at session
    /// teardown so no timer fires into torn-down state.
    pub fn reset(&mut self) {
        self.pending_stop = None;
        self.remote_deadlines.clear();
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}
