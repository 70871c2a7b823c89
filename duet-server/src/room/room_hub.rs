use crate::room::{HubCommand, RoomError, RoomRegistry};
use crate::signaling::SignalingOutput;
use duet_core::{ClientMessage, IceServerConfig, PeerId, RoomId, ServerMessage, User};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Event loop owning the room registry.
///
/// Commands are handled one at a time, so create/join checks and their
/// broadcasts never interleave with another connection's request.
pub struct RoomHub {
    registry: RoomRegistry,
    connected: HashSet<PeerId>,
    command_rx: mpsc::Receiver<HubCommand>,
    signaling: Arc<dyn SignalingOutput>,
    ice_servers: Vec<IceServerConfig>,
}

impl RoomHub {
    pub fn new(
        command_rx: mpsc::Receiver<HubCommand>,
        signaling: Arc<dyn SignalingOutput>,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(),
            connected: HashSet::new(),
            command_rx,
            signaling,
            ice_servers,
        }
    }

    pub async fn run(mut self) {
        info!("Room hub event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Command channel closed. Room hub finished");
    }

    async fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Connect { peer_id } => {
                info!("Peer {} connected", peer_id);
                self.connected.insert(peer_id.clone());

                self.signaling
                    .send(
                        peer_id.clone(),
                        ServerMessage::Welcome {
                            peer_id: peer_id.clone(),
                        },
                    )
                    .await;
                self.signaling
                    .send(
                        peer_id,
                        ServerMessage::IceConfig {
                            ice_servers: self.ice_servers.clone(),
                        },
                    )
                    .await;
            }

            HubCommand::Message { peer_id, msg } => self.handle_message(peer_id, msg).await,

            HubCommand::Disconnect { peer_id } => {
                self.connected.remove(&peer_id);
                match self.registry.leave(&peer_id) {
                    Some(room) => info!("Peer {} disconnected, left room '{}'", peer_id, room),
                    None => info!("Peer {} disconnected", peer_id),
                }
            }
        }
    }

    async fn handle_message(&mut self, peer_id: PeerId, msg: ClientMessage) {
        match msg {
            ClientMessage::CreateRoom { email, room } => {
                info!("{} ({}) creates room '{}'", email, peer_id, room);
                let user = User {
                    email: email.clone(),
                    socket_id: peer_id.clone(),
                };

                match self.registry.create(room.clone(), user) {
                    Ok(()) => self.announce_join(peer_id, room, email, None).await,
                    Err(e) => self.reject(peer_id, e).await,
                }
            }

            ClientMessage::JoinRoom { email, room } => {
                info!("{} ({}) joins room '{}'", email, peer_id, room);
                let user = User {
                    email: email.clone(),
                    socket_id: peer_id.clone(),
                };

                match self.registry.join(room.clone(), user) {
                    Ok(partner) => self.announce_join(peer_id, room, email, partner).await,
                    Err(e) => self.reject(peer_id, e).await,
                }
            }

            relay => {
                let Some(target) = relay.target().cloned() else {
                    return;
                };
                if !self.connected.contains(&target) {
                    warn!("Dropping relay from {} to unknown peer {}", peer_id, target);
                    return;
                }
                if self.registry.room_of(&peer_id) != self.registry.room_of(&target) {
                    debug!("Relaying across rooms: {} -> {}", peer_id, target);
                }
                if let Some(out) = ServerMessage::relayed(peer_id, relay) {
                    self.signaling.send(target, out).await;
                }
            }
        }
    }

    async fn announce_join(
        &self,
        peer_id: PeerId,
        room_id: RoomId,
        email: String,
        partner: Option<User>,
    ) {
        let rooms = self.registry.snapshot();

        let others: Vec<PeerId> = self
            .registry
            .members(&room_id)
            .map(|room| {
                room.users
                    .iter()
                    .filter(|u| u.socket_id != peer_id)
                    .map(|u| u.socket_id.clone())
                    .collect()
            })
            .unwrap_or_default();

        for other in others {
            self.signaling
                .send(
                    other,
                    ServerMessage::UserJoined {
                        email: email.clone(),
                        id: peer_id.clone(),
                        rooms: rooms.clone(),
                    },
                )
                .await;
        }

        self.signaling
            .send(
                peer_id.clone(),
                ServerMessage::Joined {
                    room: room_id,
                    email,
                    rooms: rooms.clone(),
                },
            )
            .await;

        if let Some(partner) = partner {
            self.signaling
                .send(
                    peer_id,
                    ServerMessage::UserJoined {
                        email: partner.email,
                        id: partner.socket_id,
                        rooms,
                    },
                )
                .await;
        }
    }

    async fn reject(&self, peer_id: PeerId, err: RoomError) {
        warn!("Room request from {} rejected: {:?}", peer_id, err);
        let msg = err.to_string();

        let out = match err {
            RoomError::NotFound(_) => ServerMessage::RoomNotFound { msg },
            RoomError::Duplicate(_) | RoomError::AlreadyJoined(_) => {
                ServerMessage::DuplicateRoom { msg }
            }
        };
        self.signaling.send(peer_id, out).await;
    }
}
