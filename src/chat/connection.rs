// Connection Manager: one live push connection per session.
//
// The socket is split into a reader task that forwards frames into the
// dispatch channel and a writer task that drains outbound envelopes. State
// lives here; the dispatch loop is the only caller that moves it.

use anyhow::{anyhow, Result};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;

use super::events::{ChatError, OutboundEnvelope};
use super::ClientEvent;
use crate::models::ConnectionState;

const CONNECT_ATTEMPTS: u32 = 3;

pub struct ConnectionManager {
    state: ConnectionState,
    outbound_tx: Option<mpsc::UnboundedSender<OutboundEnvelope>>,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        ConnectionManager {
            state: ConnectionState::Idle,
            outbound_tx: None,
            reader_task: None,
            writer_task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Establish the push connection addressed to `user_id`. Retries up to
    /// three times with exponential backoff before giving up. There is no
    /// automatic reconnect after an established connection drops; the drop
    /// surfaces as a `ConnectionClosed` event instead.
    pub async fn connect(
        &mut self,
        ws_base: &str,
        user_id: i64,
        event_tx: mpsc::Sender<ClientEvent>,
    ) -> Result<()> {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            return Err(anyhow!("push connection already active"));
        }
        self.state = ConnectionState::Connecting;

        let url = format!("{}/ws/{}", ws_base.trim_end_matches('/'), user_id);
        let mut last_error = None;

        for attempt in 1..=CONNECT_ATTEMPTS {
            info!(
                "Connecting to push channel (attempt {}/{})...",
                attempt, CONNECT_ATTEMPTS
            );
            match tokio_tungstenite::connect_async(&url).await {
                Ok((ws_stream, _)) => {
                    let (mut ws_write, mut ws_read) = ws_stream.split();

                    let (outbound_tx, mut outbound_rx) =
                        mpsc::unbounded_channel::<OutboundEnvelope>();
                    let writer = tokio::spawn(async move {
                        while let Some(envelope) = outbound_rx.recv().await {
                            let json = match serde_json::to_string(&envelope) {
                                Ok(json) => json,
                                Err(e) => {
                                    error!("Failed to encode outbound envelope: {}", e);
                                    continue;
                                }
                            };
                            if let Err(e) =
                                ws_write.send(tungstenite::Message::Text(json.into())).await
                            {
                                warn!("Push channel write failed: {}", e);
                                break;
                            }
                        }
                        // The sender was dropped at teardown; close cleanly.
                        let _ = ws_write.close().await;
                    });

                    let reader = tokio::spawn(async move {
                        while let Some(frame) = ws_read.next().await {
                            match frame {
                                Ok(tungstenite::Message::Text(text)) => {
                                    if event_tx
                                        .send(ClientEvent::Push(text.to_string()))
                                        .await
                                        .is_err()
                                    {
                                        // Dispatch loop is gone; nothing left to notify.
                                        return;
                                    }
                                }
                                Ok(tungstenite::Message::Close(_)) => break,
                                Ok(_) => {} // ping/pong/binary carry no events
                                Err(e) => {
                                    warn!("{}: {}", ChatError::ConnectionLost, e);
                                    break;
                                }
                            }
                        }
                        let _ = event_tx.send(ClientEvent::ConnectionClosed).await;
                    });

                    self.outbound_tx = Some(outbound_tx);
                    self.reader_task = Some(reader);
                    self.writer_task = Some(writer);
                    self.state = ConnectionState::Open;
                    info!("Push channel open for user {}", user_id);
                    return Ok(());
                }
                Err(e) => {
                    error!(
                        "Failed to connect on attempt {}/{}: {}",
                        attempt, CONNECT_ATTEMPTS, e
                    );
                    last_error = Some(anyhow!("connection error: {}", e));
                }
            }

            if attempt < CONNECT_ATTEMPTS {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                info!("Retrying connection in {:?}", backoff);
                tokio::time::sleep(backoff).await;
            }
        }

        self.state = ConnectionState::Closed;
        Err(last_error.unwrap_or_else(|| {
            anyhow!(
                "failed to open push channel after {} attempts",
                CONNECT_ATTEMPTS
            )
        }))
    }

    /// Queue an envelope for the writer. Fails silently when the connection
    /// is not open: logged, never returned as an error.
    pub fn send(&self, envelope: OutboundEnvelope) {
        if self.state != ConnectionState::Open {
            warn!(
                "Dropping outbound envelope, connection is {:?}",
                self.state
            );
            return;
        }
        if let Some(tx) = &self.outbound_tx {
            if tx.send(envelope).is_err() {
                warn!("Dropping outbound envelope, writer has shut down");
            }
        }
    }

    /// Record an unexpected closure observed by the dispatch loop. Presence
    /// will drift stale until the directory's next snapshot; there is no
    /// retry here.
    pub fn mark_closed(&mut self) {
        if self.state != ConnectionState::Closed {
            info!("Push channel closed by the remote end");
        }
        self.state = ConnectionState::Closed;
        self.outbound_tx = None;
    }

    /// Deterministic teardown. The reader is stopped so no event fires after
    /// this returns; dropping the outbound sender lets the writer flush and
    /// close the socket. A second call is a no-op.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed && self.reader_task.is_none() {
            return;
        }
        info!("Closing push channel");
        self.outbound_tx = None;
        if let Some(reader) = self.reader_task.take() {
            reader.abort();
        }
        self.writer_task = None;
        self.state = ConnectionState::Closed;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}
