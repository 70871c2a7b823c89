use anyhow::{Context, Result};
use duet_client::{
    MediaCapture, NegotiationEngine, SessionCoordinator, SessionEvent, SessionHandle, WsChannel,
};
use duet_server::{ServerConfig, router, start};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;

use super::fake_media::CountingSource;
use super::fake_resource::{FakeHandle, FakePeerResource};

pub const EVENT_TIMEOUT_MS: u64 = 3000;

/// Binds the signaling service on an ephemeral local port.
pub async fn spawn_server() -> Result<SocketAddr> {
    let app = router(start(ServerConfig::default()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind test listener")?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(addr)
}

/// Waits for the first event matching `pred`, skipping the others.
pub async fn wait_for<F>(
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    mut pred: F,
) -> Result<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let deadline = Duration::from_millis(EVENT_TIMEOUT_MS);
    tokio::time::timeout(deadline, async {
        while let Some(evt) = events.recv().await {
            if pred(&evt) {
                return Some(evt);
            }
        }
        None
    })
    .await
    .context("Timed out waiting for session event")?
    .context("Session event stream closed")
}

/// A session over a real websocket whose peer connection is faked.
pub struct WsTestSession {
    pub handle: SessionHandle,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub fake: FakeHandle,
    pub source: CountingSource,
}

impl WsTestSession {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let channel = WsChannel::connect(&format!("ws://{addr}/ws")).await?;

        let mut engine = NegotiationEngine::new();
        let (resource, fake) = FakePeerResource::new(engine.event_sink());
        engine.install(resource);

        let source = CountingSource::default();
        let (events_tx, events) = mpsc::unbounded_channel();
        let coordinator =
            SessionCoordinator::new(channel, engine, MediaCapture::new(source.clone()), events_tx);

        let (handle, commands) = SessionHandle::channel(16);
        tokio::spawn(coordinator.run(commands));

        Ok(Self {
            handle,
            events,
            fake,
            source,
        })
    }

    pub async fn wait_for<F>(&mut self, pred: F) -> Result<SessionEvent>
    where
        F: FnMut(&SessionEvent) -> bool,
    {
        wait_for(&mut self.events, pred).await
    }
}
