use crate::engine::engine_event::{PeerState, RemoteTrackHandle, ResourceEvent, TrackKind};
use crate::engine::peer_resource::PeerResource;
use crate::media::LocalTrack;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use duet_core::utils::default_ice_servers;
use duet_core::{IceServerConfig, SdpKind, SessionDescription};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

#[derive(Clone, Debug)]
pub struct RtcOptions {
    pub ice_servers: Vec<IceServerConfig>,
    /// Upper bound on ICE gathering before a description is returned.
    pub gather_timeout: Duration,
    /// Also gather loopback candidates, for peers on the same host.
    pub loopback_candidates: bool,
}

impl Default for RtcOptions {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            gather_timeout: Duration::from_secs(2),
            loopback_candidates: false,
        }
    }
}

/// [`PeerResource`] backed by a webrtc-rs peer connection.
///
/// Candidates are not trickled: descriptions are returned once ICE gathering
/// finishes (bounded by `gather_timeout`) so the SDP carries them.
///
/// webrtc-rs has no signaling rollback, so offers are made withdrawable
/// another way. Once a round has completed, a local offer is only applied
/// together with its answer and withdrawing it means forgetting it. Before
/// that, the connection carries nothing yet and is replaced by a fresh one.
pub struct RtcPeerResource {
    options: RtcOptions,
    event_tx: mpsc::UnboundedSender<ResourceEvent>,
    peer_connection: Mutex<Arc<RTCPeerConnection>>,
    /// Bumped on every replacement; callbacks of older connections go quiet.
    generation: Arc<AtomicU64>,
    pending_offer: Mutex<Option<RTCSessionDescription>>,
    tracks: Mutex<Vec<LocalTrack>>,
}

impl RtcPeerResource {
    pub async fn new(
        options: RtcOptions,
        event_tx: mpsc::UnboundedSender<ResourceEvent>,
    ) -> Result<Self> {
        let generation = Arc::new(AtomicU64::new(0));
        let peer_connection = new_peer_connection(&options, &event_tx, 0, &generation).await?;

        Ok(Self {
            options,
            event_tx,
            peer_connection: Mutex::new(Arc::new(peer_connection)),
            generation,
            pending_offer: Mutex::new(None),
            tracks: Mutex::new(Vec::new()),
        })
    }

    fn connection(&self) -> Arc<RTCPeerConnection> {
        Arc::clone(&lock(&self.peer_connection))
    }

    /// Applies a local description and returns it once gathering is done.
    async fn apply_local(
        &self,
        peer_connection: &RTCPeerConnection,
        desc: RTCSessionDescription,
    ) -> Result<SessionDescription> {
        let mut gathering = peer_connection.gathering_complete_promise().await;

        peer_connection
            .set_local_description(desc)
            .await
            .context("Failed to set local description")?;

        if tokio::time::timeout(self.options.gather_timeout, gathering.recv())
            .await
            .is_err()
        {
            warn!(
                "ICE gathering did not finish within {:?}, sending partial candidates",
                self.options.gather_timeout
            );
        }

        let local = peer_connection
            .local_description()
            .await
            .context("Local description missing after apply")?;
        from_rtc(&local)
    }

    async fn replace_connection(&self) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let fresh = Arc::new(
            new_peer_connection(&self.options, &self.event_tx, generation, &self.generation)
                .await?,
        );

        let tracks = lock(&self.tracks).clone();
        for track in tracks {
            attach_track(&fresh, track).await?;
        }

        let stale = std::mem::replace(&mut *lock(&self.peer_connection), fresh);
        if let Err(e) = stale.close().await {
            warn!("Failed to close replaced peer connection: {e}");
        }
        Ok(())
    }
}

#[async_trait]
impl PeerResource for RtcPeerResource {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let peer_connection = self.connection();
        let offer = peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;

        if peer_connection.current_remote_description().await.is_none() {
            return self.apply_local(&peer_connection, offer).await;
        }

        // Transports are up and the offer already lists the gathered candidates.
        let sendable = from_rtc(&offer)?;
        *lock(&self.pending_offer) = Some(offer);
        debug!("Local offer held until its answer arrives");
        Ok(sendable)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let peer_connection = self.connection();
        let answer = peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        self.apply_local(&peer_connection, answer).await
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let peer_connection = self.connection();
        let remote = to_rtc(desc)?;

        if remote.sdp_type == RTCSdpType::Answer {
            let pending = lock(&self.pending_offer).take();
            if let Some(offer) = pending {
                peer_connection
                    .set_local_description(offer)
                    .await
                    .context("Failed to apply held local offer")?;
            }
        }

        peer_connection
            .set_remote_description(remote)
            .await
            .context("Failed to set remote description")?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        if lock(&self.pending_offer).take().is_some() {
            debug!("Held local offer dropped");
            return Ok(());
        }

        let peer_connection = self.connection();
        let state = peer_connection.signaling_state();
        if state == RTCSignalingState::Stable {
            return Ok(());
        }
        if peer_connection.current_remote_description().await.is_some() {
            bail!("Cannot leave {state} on an established connection");
        }

        info!("Replacing peer connection to leave {state}");
        self.replace_connection().await
    }

    async fn add_track(&self, track: LocalTrack) -> Result<()> {
        attach_track(&self.connection(), Arc::clone(&track)).await?;
        lock(&self.tracks).push(track);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.connection().close().await?;
        Ok(())
    }
}

async fn new_peer_connection(
    options: &RtcOptions,
    event_tx: &mpsc::UnboundedSender<ResourceEvent>,
    generation: u64,
    current: &Arc<AtomicU64>,
) -> Result<RTCPeerConnection> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;

    let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

    let mut setting_engine = SettingEngine::default();
    setting_engine.set_include_loopback_candidate(options.loopback_candidates);

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .with_setting_engine(setting_engine)
        .build();

    let rtc_config = RTCConfiguration {
        ice_servers: options.ice_servers.iter().map(to_rtc_ice_server).collect(),
        ..Default::default()
    };

    let peer_connection = api.new_peer_connection(rtc_config).await?;

    // Offers made before any track is attached still carry audio and video
    // sections, and with them the ICE credentials.
    for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
        peer_connection
            .add_transceiver_from_kind(
                kind,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
    }

    let state_tx = event_tx.clone();
    let live = Arc::clone(current);
    peer_connection.on_peer_connection_state_change(Box::new(
        move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let replaced = live.load(Ordering::SeqCst) != generation;
            Box::pin(async move {
                if replaced {
                    debug!("Replaced peer connection is {s}");
                    return;
                }
                info!("Peer connection state changed: {s}");
                let _ = tx.send(ResourceEvent::StateChanged(peer_state(s)));
            })
        },
    ));

    let track_tx = event_tx.clone();
    let live = Arc::clone(current);
    peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
        let tx = track_tx.clone();
        let replaced = live.load(Ordering::SeqCst) != generation;
        Box::pin(async move {
            if replaced {
                return;
            }
            let handle = RemoteTrackHandle {
                stream_id: track.stream_id(),
                track_id: track.id(),
                kind: track_kind(track.kind()),
                track: Some(Arc::clone(&track)),
            };
            debug!("Remote track arrived: {:?}", handle);
            let _ = tx.send(ResourceEvent::RemoteTrack(handle));
        })
    }));

    Ok(peer_connection)
}

async fn attach_track(peer_connection: &RTCPeerConnection, track: LocalTrack) -> Result<()> {
    let sender = peer_connection
        .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
        .await
        .context("Failed to add local track")?;

    // Incoming RTCP has to be drained for the interceptors to run.
    tokio::spawn(async move {
        let mut rtcp_buf = vec![0u8; 1500];
        while sender.read(&mut rtcp_buf).await.is_ok() {}
    });
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn to_rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

fn from_rtc(desc: &RTCSessionDescription) -> Result<SessionDescription> {
    match desc.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp.clone())),
        RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp.clone())),
        other => bail!("Unsupported description type: {other}"),
    }
}

fn peer_state(state: RTCPeerConnectionState) -> PeerState {
    match state {
        RTCPeerConnectionState::Connecting => PeerState::Connecting,
        RTCPeerConnectionState::Connected => PeerState::Connected,
        RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
        RTCPeerConnectionState::Failed => PeerState::Failed,
        RTCPeerConnectionState::Closed => PeerState::Closed,
        _ => PeerState::New,
    }
}

fn track_kind(kind: RTPCodecType) -> TrackKind {
    match kind {
        RTPCodecType::Audio => TrackKind::Audio,
        RTPCodecType::Video => TrackKind::Video,
        _ => TrackKind::Unknown,
    }
}
