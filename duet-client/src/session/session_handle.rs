use crate::session::session_error::SessionError;
use crate::session::session_event::SessionCommand;
use duet_core::RoomId;
use tokio::sync::mpsc;

/// Cloneable sender for a running [`SessionCoordinator`](super::SessionCoordinator).
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Creates the handle and the receiver to pass to `SessionCoordinator::run`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SessionCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    async fn submit(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.tx.send(cmd).await.map_err(|_| SessionError::Ended)
    }

    pub async fn create_room(
        &self,
        email: impl Into<String>,
        room: impl Into<RoomId>,
    ) -> Result<(), SessionError> {
        self.submit(SessionCommand::CreateRoom {
            email: email.into(),
            room: room.into(),
        })
        .await
    }

    pub async fn join_room(
        &self,
        email: impl Into<String>,
        room: impl Into<RoomId>,
    ) -> Result<(), SessionError> {
        self.submit(SessionCommand::JoinRoom {
            email: email.into(),
            room: room.into(),
        })
        .await
    }

    pub async fn call(&self) -> Result<(), SessionError> {
        self.submit(SessionCommand::Call).await
    }

    pub async fn send_streams(&self) -> Result<(), SessionError> {
        self.submit(SessionCommand::SendStreams).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.submit(SessionCommand::Shutdown).await
    }
}
