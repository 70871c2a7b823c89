use crate::room::HubCommand;
use crate::signaling::SignalingService;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use duet_core::{ClientMessage, PeerId};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: SignalingService) {
    let peer_id = PeerId::new();
    info!("New WebSocket connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.add_peer(peer_id.clone(), tx);

    if service
        .hub_tx
        .send(HubCommand::Connect {
            peer_id: peer_id.clone(),
        })
        .await
        .is_err()
    {
        error!("Room hub is gone, refusing {}", peer_id);
        service.remove_peer(&peer_id);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match ClientMessage::decode(text.as_str()) {
                        Ok(msg) => {
                            let cmd = HubCommand::Message {
                                peer_id: peer_id.clone(),
                                msg,
                            };
                            if let Err(e) = service.hub_tx.send(cmd).await {
                                error!("Room hub died: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid client message from {}: {}", peer_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_peer(&peer_id);
    let _ = service
        .hub_tx
        .send(HubCommand::Disconnect {
            peer_id: peer_id.clone(),
        })
        .await;
    info!("WebSocket disconnected: {}", peer_id);
}
