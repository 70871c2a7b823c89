use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to signaling service: {0}")]
    Connect(String),

    #[error("signaling channel is closed")]
    Closed,

    #[error("failed to encode client message: {0}")]
    Encode(#[from] serde_json::Error),
}
