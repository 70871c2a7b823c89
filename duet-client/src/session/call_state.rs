use duet_core::PeerId;
use std::fmt;

/// Where a client is in the room and call lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState {
    /// Not in a room.
    Idle,
    /// In a room, alone.
    AwaitingRemote,
    /// Knows a remote participant, no call yet.
    Paired { remote: PeerId },
    /// Sent the initial offer.
    Offering { remote: PeerId },
    /// Answered an incoming call, local tracks not sent yet.
    Answering { remote: PeerId },
    Connected { remote: PeerId },
    /// Sent a renegotiation offer.
    RenegotiatingOffer { remote: PeerId },
    /// Answering a renegotiation offer.
    RenegotiatingAnswer { remote: PeerId },
    Ended,
}

impl CallState {
    pub fn remote(&self) -> Option<&PeerId> {
        match self {
            Self::Paired { remote }
            | Self::Offering { remote }
            | Self::Answering { remote }
            | Self::Connected { remote }
            | Self::RenegotiatingOffer { remote }
            | Self::RenegotiatingAnswer { remote } => Some(remote),
            Self::Idle | Self::AwaitingRemote | Self::Ended => None,
        }
    }

    /// A call has been offered or answered.
    pub fn in_call(&self) -> bool {
        matches!(
            self,
            Self::Offering { .. }
                | Self::Answering { .. }
                | Self::Connected { .. }
                | Self::RenegotiatingOffer { .. }
                | Self::RenegotiatingAnswer { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingRemote => "awaiting-remote",
            Self::Paired { .. } => "paired",
            Self::Offering { .. } => "offering",
            Self::Answering { .. } => "answering",
            Self::Connected { .. } => "connected",
            Self::RenegotiatingOffer { .. } => "renegotiating-offer",
            Self::RenegotiatingAnswer { .. } => "renegotiating-answer",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote() {
            Some(remote) => write!(f, "{} ({remote})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}
