mod peer;
mod room;
mod session;
mod signaling;

pub use peer::{PeerId, PeerIdError};
pub use room::{Room, RoomId, RoomIndex, User};
pub use session::{SdpKind, SessionDescription};
pub use signaling::{ClientMessage, IceServerConfig, ServerMessage};
