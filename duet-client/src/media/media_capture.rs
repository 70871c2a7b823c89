use crate::media::media_error::MediaError;
use crate::media::media_stream::MediaStream;
use async_trait::async_trait;
use tracing::info;

/// Something that can produce the local audio/video stream.
#[async_trait]
pub trait MediaSource: Send + Sync + 'static {
    async fn acquire(&self) -> Result<MediaStream, MediaError>;
}

/// Lazily acquires the local stream and hands out shared views of it.
///
/// The source is asked at most once while a stream is held.
pub struct MediaCapture<S> {
    source: S,
    stream: Option<MediaStream>,
}

impl<S: MediaSource> MediaCapture<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            stream: None,
        }
    }

    pub async fn stream(&mut self) -> Result<MediaStream, MediaError> {
        if let Some(stream) = &self.stream {
            return Ok(stream.clone());
        }

        let stream = self.source.acquire().await?;
        info!(
            "Acquired local stream {} with {} track(s)",
            stream.id(),
            stream.tracks().len()
        );
        self.stream = Some(stream.clone());
        Ok(stream)
    }

    pub fn is_acquired(&self) -> bool {
        self.stream.is_some()
    }

    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            info!("Released local stream {}", stream.id());
        }
    }
}
