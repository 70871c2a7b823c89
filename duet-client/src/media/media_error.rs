use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("permission to capture media was denied")]
    PermissionDenied,

    #[error("no capture device available")]
    NoDevice,

    #[error("media capture failed: {0}")]
    Unavailable(String),
}
