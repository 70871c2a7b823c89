use duet_core::RoomId;
use thiserror::Error;

/// Rejections of a room request. The display text is shown to the user as is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("A room with this name already exists!")]
    Duplicate(RoomId),

    #[error("No room has been created!")]
    NotFound(RoomId),

    #[error("You are already in room '{0}'")]
    AlreadyJoined(RoomId),
}
