use crate::channel::ChannelError;
use crate::engine::NegotiationError;
use crate::media::MediaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unexpected {event} while {state}")]
    UnexpectedEvent {
        event: &'static str,
        state: &'static str,
    },

    #[error("already in a room")]
    AlreadyInRoom,

    #[error("no remote participant to call")]
    NoRemotePeer,

    #[error("session has ended")]
    Ended,

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
