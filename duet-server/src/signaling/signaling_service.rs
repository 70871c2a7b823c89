use crate::room::HubCommand;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use duet_core::{PeerId, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

struct SignalingInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
}

#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    pub(crate) hub_tx: mpsc::Sender<HubCommand>,
}

impl SignalingService {
    pub fn new(hub_tx: mpsc::Sender<HubCommand>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
            }),
            hub_tx,
        }
    }

    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(peer_id, tx);
    }

    pub fn remove_peer(&self, peer_id: &PeerId) {
        self.inner.peers.remove(peer_id);
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn send_signal(&self, peer_id: PeerId, msg: ServerMessage) {
        if let Some(peer) = self.inner.peers.get(&peer_id) {
            match msg.encode() {
                Ok(json) => {
                    if let Err(e) = peer.send(Message::Text(json.into())) {
                        error!("Failed to send WS message to {}: {:?}", peer_id, e);
                    }
                }
                Err(e) => error!("Failed to serialize server message: {}", e),
            }
        } else {
            warn!("Attempted to send signal to disconnected peer {}", peer_id);
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send(&self, peer_id: PeerId, msg: ServerMessage) {
        self.send_signal(peer_id, msg);
    }
}
