//! Chat over the session data channel.
//!
//! Outbound messages are serialized as a small JSON payload and published
//! reliably on the configured topic, with an immediate local echo so the
//! sender sees their own message without waiting on the network. Inbound
//! packets on other topics are ignored; packets from the local identity
//! are dropped in case the engine echoes reliable payloads back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rtc_engine::session::SessionHandle;
use rtc_engine::types::{DataPacket, DataPublishOptions, EngineEvent, ParticipantIdentity};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::errors::MediaError;
use crate::subscription::SubscriptionGuard;

/// Wire shape of one chat payload.
#[derive(Debug, Serialize, Deserialize)]
struct ChatWire {
    name: String,
    body: String,
}

/// One entry in the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Transcript-local ordinal, strictly increasing.
    pub id: u64,
    /// Sender identity, when the engine reported one.
    pub sender: Option<ParticipantIdentity>,
    /// Sender display name.
    pub sender_name: String,
    /// Message text.
    pub body: String,
    /// When this client appended the message.
    pub received_at: DateTime<Utc>,
    /// Whether the local participant sent it.
    pub is_local: bool,
}

struct Transcript {
    messages: Mutex<Vec<ChatMessage>>,
    next_id: AtomicU64,
}

impl Transcript {
    fn append(&self, mut message: ChatMessage) -> ChatMessage {
        message.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.clone());
        }
        message
    }
}

/// Sends and receives chat messages on one data-channel topic.
pub struct ChatAdapter {
    session: Arc<dyn SessionHandle>,
    topic: String,
    transcript: Arc<Transcript>,
    guard: SubscriptionGuard,
}

impl ChatAdapter {
    /// Spawn the inbound listener.
    #[must_use]
    pub fn spawn(session: Arc<dyn SessionHandle>, topic: String) -> Self {
        let transcript = Arc::new(Transcript {
            messages: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        });
        let local_identity = session.local_participant().identity();
        let mut events = session.subscribe();
        let token = CancellationToken::new();

        let task = tokio::spawn({
            let token = token.clone();
            let transcript = transcript.clone();
            let topic = topic.clone();
            async move {
                loop {
                    tokio::select! {
                        () = token.cancelled() => break,
                        event = events.recv() => match event {
                            Ok(EngineEvent::DataReceived(packet)) => {
                                handle_inbound(&transcript, &topic, &local_identity, packet);
                            }
                            Ok(_) => {}
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(target: "controller.chat", skipped, "event stream lagged, messages may be missing");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
            }
        });

        Self {
            session,
            topic,
            transcript,
            guard: SubscriptionGuard::new(token, task),
        }
    }

    /// Send a message and append the local echo.
    pub async fn send(&self, body: &str) -> Result<ChatMessage, MediaError> {
        if !self.session.connection_state().is_connected() {
            return Err(MediaError::NotConnected);
        }

        let local = self.session.local_participant();
        let wire = ChatWire {
            name: local.display_name(),
            body: body.to_string(),
        };
        let payload = serde_json::to_vec(&wire)
            .map_err(|err| MediaError::ChannelSend(err.to_string()))?;

        local
            .publish_data(
                Bytes::from(payload),
                DataPublishOptions {
                    topic: self.topic.clone(),
                    reliable: true,
                },
            )
            .await?;

        let echoed = self.transcript.append(ChatMessage {
            id: 0,
            sender: Some(local.identity()),
            sender_name: local.display_name(),
            body: body.to_string(),
            received_at: Utc::now(),
            is_local: true,
        });
        trace!(target: "controller.chat", id = echoed.id, "chat message sent");
        Ok(echoed)
    }

    /// The transcript so far, in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        match self.transcript.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Stop the inbound listener ahead of session teardown.
    pub fn shutdown(&self) {
        self.guard.cancel();
    }
}

fn handle_inbound(
    transcript: &Transcript,
    topic: &str,
    local_identity: &ParticipantIdentity,
    packet: DataPacket,
) {
    if packet.topic != topic {
        return;
    }
    if packet.sender.as_ref() == Some(local_identity) {
        trace!(target: "controller.chat", "dropping echoed local packet");
        return;
    }

    // Well-formed payloads carry a JSON name/body pair; anything else is
    // treated as a bare text body from an older client.
    let (name, body) = match serde_json::from_slice::<ChatWire>(&packet.data) {
        Ok(wire) => (wire.name, wire.body),
        Err(_) => {
            let body = String::from_utf8_lossy(&packet.data).into_owned();
            let name = packet
                .sender_name
                .clone()
                .or_else(|| packet.sender.as_ref().map(ToString::to_string))
                .unwrap_or_else(|| "unknown".to_string());
            (name, body)
        }
    };

    let message = transcript.append(ChatMessage {
        id: 0,
        sender: packet.sender,
        sender_name: name,
        body,
        received_at: Utc::now(),
        is_local: false,
    });
    debug!(target: "controller.chat", id = message.id, "chat message received");
}
