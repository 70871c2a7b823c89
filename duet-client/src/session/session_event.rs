use crate::engine::{PeerState, RemoteTrackHandle};
use crate::media::MediaStream;
use crate::session::call_state::CallState;
use duet_core::{PeerId, RoomId, RoomIndex};

/// Reported to whoever drives the session (a UI, the CLI, tests).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Welcome { peer_id: PeerId },
    Joined { room: RoomId, rooms: RoomIndex },
    /// Create or join was refused; the message is the service's.
    RoomError { msg: String },
    RemoteJoined { email: String, id: PeerId },
    StateChanged(CallState),
    /// The local stream is live for this call.
    LocalStream(MediaStream),
    RemoteTrack(RemoteTrackHandle),
    PeerState(PeerState),
}

/// Requests for a running session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    CreateRoom { email: String, room: RoomId },
    JoinRoom { email: String, room: RoomId },
    Call,
    SendStreams,
    Shutdown,
}
