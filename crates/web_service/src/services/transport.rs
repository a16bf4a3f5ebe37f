//! Session stream transport.
//!
//! Holds at most one live SSE consumer per session. Subscribing again
//! replaces the previous consumer; events already delivered to the old
//! connection are not replayed, and nothing is buffered while no
//! consumer is attached.

use actix_web_lab::sse;
use chat_core::message::MessageStatus;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::MessageOut;

const SESSION_CHANNEL_CAPACITY: usize = 64;

/// Outbound event sink for one turn.
///
/// `send` is best-effort: with no live consumer the event is dropped.
/// `cancellation` fires when the consumer that was attached at the
/// time of the call disconnects, letting an in-flight turn stop
/// pulling provider deltas nobody will see.
pub trait StreamTransport: Send + Sync {
    fn send(&self, event: &MessageOut);
    fn cancellation(&self) -> CancellationToken;
}

struct SessionSlot {
    sender: mpsc::Sender<sse::Event>,
    cancel: CancellationToken,
}

/// Registry of live per-session stream consumers.
#[derive(Default)]
pub struct SessionHub {
    sessions: DashMap<String, SessionSlot>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a consumer to a session, replacing any previous one.
    /// The previous consumer's channel closes; the in-flight turn (if
    /// any) keeps running and its subsequent events go to the new
    /// consumer.
    pub fn subscribe(&self, session_id: &str) -> mpsc::Receiver<sse::Event> {
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let slot = SessionSlot {
            sender: tx,
            cancel: CancellationToken::new(),
        };
        if self.sessions.insert(session_id.to_string(), slot).is_some() {
            tracing::debug!(session_id = %session_id, "replacing live stream consumer");
        } else {
            tracing::debug!(session_id = %session_id, "stream consumer attached");
        }
        rx
    }

    pub fn handle(self: &Arc<Self>, session_id: &str) -> SessionHandle {
        SessionHandle {
            hub: Arc::clone(self),
            session_id: session_id.to_string(),
        }
    }

    fn send_to(&self, session_id: &str, event: &MessageOut) {
        // Terminal snapshots end the turn on the client; unlike
        // partials they are never allowed to drop, since nothing
        // replays them.
        let terminal = matches!(
            event.status,
            MessageStatus::Complete | MessageStatus::Error
        );

        let data = match sse::Data::new_json(event) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "failed to serialize stream event");
                return;
            }
        };

        // Clone the sender out of the map; never hold a shard lock
        // across channel operations.
        let sender = match self.sessions.get(session_id) {
            Some(slot) => slot.sender.clone(),
            None => {
                tracing::debug!(session_id = %session_id, "no stream consumer, dropping event");
                return;
            }
        };

        if let Err(e) = sender.try_send(sse::Event::Data(data)) {
            match e {
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::debug!(session_id = %session_id, "stream consumer disconnected");
                    self.drop_consumer(session_id, &sender);
                }
                mpsc::error::TrySendError::Full(event) => {
                    if terminal {
                        tracing::warn!(
                            session_id = %session_id,
                            "stream consumer lagging, queueing terminal event"
                        );
                        tokio::spawn(async move {
                            let _ = sender.send(event).await;
                        });
                    } else {
                        tracing::warn!(
                            session_id = %session_id,
                            "stream consumer lagging, dropping partial event"
                        );
                    }
                }
            }
        }
    }

    /// Remove a session's slot and fire its cancellation token. Called
    /// when a send observes the consumer's channel closed. Only the
    /// slot that owns the failed sender is evicted, so a replacement
    /// attached in the meantime is left alone.
    fn drop_consumer(&self, session_id: &str, sender: &mpsc::Sender<sse::Event>) {
        if let Some((_, slot)) = self
            .sessions
            .remove_if(session_id, |_, slot| slot.sender.same_channel(sender))
        {
            slot.cancel.cancel();
        }
    }

    fn cancellation_for(&self, session_id: &str) -> CancellationToken {
        self.sessions
            .get(session_id)
            .map(|slot| slot.cancel.clone())
            // No consumer attached: the turn runs to completion and
            // its events are dropped.
            .unwrap_or_default()
    }
}

/// Transport bound to one session, handed to the turn pipeline.
#[derive(Clone)]
pub struct SessionHandle {
    hub: Arc<SessionHub>,
    session_id: String,
}

impl StreamTransport for SessionHandle {
    fn send(&self, event: &MessageOut) {
        self.hub.send_to(&self.session_id, event);
    }

    fn cancellation(&self) -> CancellationToken {
        self.hub.cancellation_for(&self.session_id)
    }
}
