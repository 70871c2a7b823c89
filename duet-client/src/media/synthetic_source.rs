use crate::media::media_capture::MediaSource;
use crate::media::media_error::MediaError;
use crate::media::media_stream::{LocalTrack, MediaStream};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Produces sample-fed tracks with no capture device behind them.
///
/// Used by headless clients; callers may write samples into the tracks.
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    audio: bool,
    video: bool,
}

impl SyntheticSource {
    pub fn new(audio: bool, video: bool) -> Self {
        Self { audio, video }
    }

    fn track(
        mime_type: &str,
        clock_rate: u32,
        channels: u16,
        kind: &str,
        stream_id: &str,
    ) -> LocalTrack {
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                clock_rate,
                channels,
                ..Default::default()
            },
            format!("{kind}-{}", Uuid::new_v4()),
            stream_id.to_owned(),
        ))
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(true, true)
    }
}

#[async_trait]
impl MediaSource for SyntheticSource {
    async fn acquire(&self) -> Result<MediaStream, MediaError> {
        if !self.audio && !self.video {
            return Err(MediaError::NoDevice);
        }

        let stream_id = format!("duet-{}", Uuid::new_v4());
        let mut tracks = Vec::new();
        if self.audio {
            tracks.push(Self::track(MIME_TYPE_OPUS, 48_000, 2, "audio", &stream_id));
        }
        if self.video {
            tracks.push(Self::track(MIME_TYPE_VP8, 90_000, 0, "video", &stream_id));
        }

        Ok(MediaStream::new(stream_id, tracks))
    }
}
