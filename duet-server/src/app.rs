use crate::config::ServerConfig;
use crate::room::RoomHub;
use crate::signaling::{SignalingService, ws_handler};
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Spawns the room hub and returns the service the websocket endpoint talks to.
///
/// Must be called from within a tokio runtime.
pub fn start(config: ServerConfig) -> SignalingService {
    let (hub_tx, hub_rx) = mpsc::channel(config.hub_queue);
    let service = SignalingService::new(hub_tx);

    let hub = RoomHub::new(hub_rx, Arc::new(service.clone()), config.ice_servers);
    tokio::spawn(hub.run());

    info!("Signaling service started");
    service
}

pub fn router(service: SignalingService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}
