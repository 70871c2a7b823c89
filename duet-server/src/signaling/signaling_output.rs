use duet_core::{PeerId, ServerMessage};
use async_trait::async_trait;

/// Outbound side of the signaling channel, implemented by the websocket layer
/// so the room hub can reach connected clients.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver one event to a single connection.
    async fn send(&self, peer_id: PeerId, msg: ServerMessage);
}
