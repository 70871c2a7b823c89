use crate::channel::SignalingChannel;
use crate::channel::channel_error::ChannelError;
use crate::channel::subscription::{SubscriberSet, Subscription};
use duet_core::{ClientMessage, ServerMessage};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-process [`SignalingChannel`] that records what is sent and lets the
/// caller inject inbound events.
#[derive(Clone)]
pub struct MemoryChannel {
    sent: Arc<Mutex<Vec<ClientMessage>>>,
    subscribers: Arc<SubscriberSet>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            subscribers: SubscriberSet::new(),
        }
    }

    fn sent_log(&self) -> MutexGuard<'_, Vec<ClientMessage>> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publishes an inbound event to every subscriber.
    pub fn deliver(&self, msg: ServerMessage) {
        self.subscribers.publish(msg);
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent_log().clone()
    }

    /// Drains and returns everything sent so far.
    pub fn take_sent(&self) -> Vec<ClientMessage> {
        std::mem::take(&mut *self.sent_log())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.subscriber_count()
    }

    pub fn close(&self) {
        self.subscribers.close();
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingChannel for MemoryChannel {
    fn send(&self, msg: ClientMessage) -> Result<(), ChannelError> {
        self.sent_log().push(msg);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }
}
