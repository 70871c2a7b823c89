use std::sync::Arc;
use webrtc::track::track_remote::TrackRemote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Unknown,
}

/// A media track received from the remote peer.
#[derive(Clone)]
pub struct RemoteTrackHandle {
    pub stream_id: String,
    pub track_id: String,
    pub kind: TrackKind,
    /// The live track; absent when the resource has no real transport.
    pub track: Option<Arc<TrackRemote>>,
}

impl std::fmt::Debug for RemoteTrackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTrackHandle")
            .field("stream_id", &self.stream_id)
            .field("track_id", &self.track_id)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Raised by a peer connection resource.
#[derive(Debug, Clone)]
pub enum ResourceEvent {
    RemoteTrack(RemoteTrackHandle),
    StateChanged(PeerState),
}

/// Raised by the negotiation engine for its owner.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Local tracks changed after the initial round; a new offer is due.
    RenegotiationNeeded,
    RemoteTrack(RemoteTrackHandle),
    StateChanged(PeerState),
}

impl From<ResourceEvent> for EngineEvent {
    fn from(evt: ResourceEvent) -> Self {
        match evt {
            ResourceEvent::RemoteTrack(handle) => Self::RemoteTrack(handle),
            ResourceEvent::StateChanged(state) => Self::StateChanged(state),
        }
    }
}
