use anyhow::{Result, anyhow};
use async_trait::async_trait;
use duet_client::{LocalTrack, PeerResource, RemoteTrackHandle, ResourceEvent, TrackKind};
use duet_core::SessionDescription;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use webrtc::track::track_local::TrackLocal;

const SDP_PREFIX: &str = "fake-sdp";

/// What the fake resource has been asked to do.
#[derive(Default)]
pub struct FakeState {
    pub local_tracks: Vec<(String, String)>,
    pub remote_tracks: HashSet<String>,
    pub local_applied: usize,
    pub remote_applied: usize,
    pub rollbacks: usize,
    pub closed: bool,
    pub version: u32,
}

#[derive(Clone, Default)]
pub struct FakeHandle(Arc<Mutex<FakeState>>);

impl FakeHandle {
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.0.lock().unwrap()
    }
}

/// Peer resource with no transport.
///
/// Descriptions list the local tracks as `stream/track` pairs, so applying a
/// remote description reports the peer's tracks as remote tracks.
pub struct FakePeerResource {
    fake: FakeHandle,
    event_tx: mpsc::UnboundedSender<ResourceEvent>,
}

impl FakePeerResource {
    pub fn new(event_tx: mpsc::UnboundedSender<ResourceEvent>) -> (Self, FakeHandle) {
        let fake = FakeHandle::default();
        (
            Self {
                fake: fake.clone(),
                event_tx,
            },
            fake,
        )
    }

    fn describe(&self) -> String {
        let mut state = self.fake.state();
        state.version += 1;
        let tracks: Vec<String> = state
            .local_tracks
            .iter()
            .map(|(stream, track)| format!("{stream}/{track}"))
            .collect();
        format!("{SDP_PREFIX} v={} tracks={}", state.version, tracks.join(","))
    }
}

#[async_trait]
impl PeerResource for FakePeerResource {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = SessionDescription::offer(self.describe());
        self.fake.state().local_applied += 1;
        Ok(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = SessionDescription::answer(self.describe());
        self.fake.state().local_applied += 1;
        Ok(answer)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        if !desc.sdp.starts_with(SDP_PREFIX) {
            return Err(
                anyhow!("missing {SDP_PREFIX} prefix").context("Malformed session description")
            );
        }

        let listed = desc
            .sdp
            .split_once("tracks=")
            .map(|(_, list)| list)
            .unwrap_or_default();

        let mut state = self.fake.state();
        state.remote_applied += 1;
        for entry in listed.split(',').filter(|e| !e.is_empty()) {
            let Some((stream_id, track_id)) = entry.split_once('/') else {
                continue;
            };
            if state.remote_tracks.insert(track_id.to_owned()) {
                let kind = if track_id.starts_with("audio") {
                    TrackKind::Audio
                } else {
                    TrackKind::Video
                };
                let _ = self.event_tx.send(ResourceEvent::RemoteTrack(RemoteTrackHandle {
                    stream_id: stream_id.to_owned(),
                    track_id: track_id.to_owned(),
                    kind,
                    track: None,
                }));
            }
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.fake.state().rollbacks += 1;
        Ok(())
    }

    async fn add_track(&self, track: LocalTrack) -> Result<()> {
        self.fake
            .state()
            .local_tracks
            .push((track.stream_id().to_owned(), track.id().to_owned()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.fake.state().closed = true;
        Ok(())
    }
}
