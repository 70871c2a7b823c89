mod channel_error;
mod memory_channel;
mod subscription;
mod ws_channel;

pub use channel_error::*;
pub use memory_channel::*;
pub use subscription::*;
pub use ws_channel::*;

use duet_core::ClientMessage;

/// Bidirectional event transport between a client and the signaling service.
///
/// Sends keep their order on one connection. Inbound events reach every live
/// [`Subscription`].
pub trait SignalingChannel: Send + Sync + 'static {
    fn send(&self, msg: ClientMessage) -> Result<(), ChannelError>;

    fn subscribe(&self) -> Subscription;
}
