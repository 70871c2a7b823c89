use duet_core::ServerMessage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Events kept for a late subscriber; later ones are dropped.
pub const BACKLOG_LIMIT: usize = 64;

#[derive(Default)]
struct SubscriberState {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<ServerMessage>>,
    backlog: Vec<ServerMessage>,
    closed: bool,
}

/// Fan-out point for inbound events.
///
/// Events published while nobody listens are kept (up to [`BACKLOG_LIMIT`])
/// and handed to the next subscriber, so a greeting sent right after
/// connecting is not lost.
#[derive(Default)]
pub struct SubscriberSet {
    state: Mutex<SubscriberState>,
}

impl SubscriberSet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, SubscriberState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();

        let id = state.next_id;
        state.next_id += 1;

        for msg in state.backlog.drain(..) {
            let _ = tx.send(msg);
        }
        if !state.closed {
            state.senders.insert(id, tx);
        }

        Subscription {
            id,
            rx,
            set: Arc::clone(self),
        }
    }

    pub fn publish(&self, msg: ServerMessage) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        if state.senders.is_empty() {
            if state.backlog.len() < BACKLOG_LIMIT {
                state.backlog.push(msg);
            } else {
                warn!("No subscriber and backlog full, dropping {:?}", msg);
            }
            return;
        }

        state.senders.retain(|_, tx| tx.send(msg.clone()).is_ok());
    }

    /// Ends every subscription once its queued events are drained.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.senders.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().senders.remove(&id);
    }
}

/// Scoped registration for inbound events; deregisters itself when dropped.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
    set: Arc<SubscriberSet>,
}

impl Subscription {
    /// Next inbound event, `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("Releasing subscription {}", self.id);
        self.set.unsubscribe(self.id);
    }
}
