use crate::channel::{SignalingChannel, WsChannel};
use crate::config::ClientConfig;
use crate::engine::{NegotiationEngine, RtcOptions, RtcPeerResource};
use crate::media::{MediaCapture, MediaSource};
use crate::session::{RoomIndexCache, SessionCoordinator, SessionEvent, SessionHandle};
use anyhow::{Context, Result, bail};
use duet_core::utils::default_ice_servers;
use duet_core::{IceServerConfig, PeerId, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// A connected client with its session running in the background.
pub struct DuetClient {
    pub local_id: PeerId,
    pub handle: SessionHandle,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub task: JoinHandle<()>,
}

/// Connects to the signaling service and starts a session.
///
/// Waits for the service greeting so the peer connection is built with the
/// advertised ICE servers, unless the config overrides them.
pub async fn connect<S: MediaSource>(config: &ClientConfig, source: S) -> Result<DuetClient> {
    let channel = WsChannel::connect(&config.server_url).await?;

    let (local_id, advertised) = tokio::time::timeout(config.handshake_timeout, greeting(&channel))
        .await
        .context("Timed out waiting for the signaling service greeting")??;
    info!("Connected to {} as {local_id}", config.server_url);

    let ice_servers = match (&config.ice_servers, advertised.is_empty()) {
        (Some(servers), _) => servers.clone(),
        (None, false) => advertised,
        (None, true) => default_ice_servers(),
    };

    let options = RtcOptions {
        ice_servers,
        gather_timeout: config.gather_timeout,
        loopback_candidates: config.loopback_candidates,
    };
    let mut engine = NegotiationEngine::new();
    let resource = RtcPeerResource::new(options, engine.event_sink()).await?;
    engine.install(resource);

    let (events_tx, events) = mpsc::unbounded_channel();
    let mut coordinator =
        SessionCoordinator::new(channel, engine, MediaCapture::new(source), events_tx)
            .with_local_id(local_id.clone());
    if let Some(path) = &config.cache_path {
        coordinator = coordinator.with_cache(RoomIndexCache::new(path));
    }

    let (handle, commands) = SessionHandle::channel(32);
    let task = tokio::spawn(coordinator.run(commands));

    Ok(DuetClient {
        local_id,
        handle,
        events,
        task,
    })
}

async fn greeting(channel: &WsChannel) -> Result<(PeerId, Vec<IceServerConfig>)> {
    let mut subscription = channel.subscribe();
    let mut local_id = None;

    while let Some(msg) = subscription.recv().await {
        match msg {
            ServerMessage::Welcome { peer_id } => local_id = Some(peer_id),
            ServerMessage::IceConfig { ice_servers } => match local_id {
                Some(id) => return Ok((id, ice_servers)),
                None => bail!("ICE configuration arrived before the greeting"),
            },
            other => bail!("Unexpected event during handshake: {:?}", other),
        }
    }
    bail!("Signaling service closed the connection during handshake")
}
