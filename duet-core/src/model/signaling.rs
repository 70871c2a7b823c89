use crate::model::peer::PeerId;
use crate::model::room::{RoomId, RoomIndex};
use crate::model::session::SessionDescription;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Events a client sends to the signaling service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ClientMessage {
    CreateRoom {
        email: String,
        room: RoomId,
    },
    JoinRoom {
        email: String,
        room: RoomId,
    },
    CallOffer {
        to: PeerId,
        offer: SessionDescription,
    },
    CallAnswer {
        to: PeerId,
        answer: SessionDescription,
    },
    RenegotiationOffer {
        to: PeerId,
        offer: SessionDescription,
    },
    RenegotiationAnswer {
        to: PeerId,
        answer: SessionDescription,
    },
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Relay target of a negotiation message, `None` for room requests.
    pub fn target(&self) -> Option<&PeerId> {
        match self {
            Self::CreateRoom { .. } | Self::JoinRoom { .. } => None,
            Self::CallOffer { to, .. }
            | Self::CallAnswer { to, .. }
            | Self::RenegotiationOffer { to, .. }
            | Self::RenegotiationAnswer { to, .. } => Some(to),
        }
    }
}

/// Events the signaling service sends to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome {
        peer_id: PeerId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    Joined {
        room: RoomId,
        email: String,
        rooms: RoomIndex,
    },
    #[serde(rename = "duplicate-error")]
    DuplicateRoom {
        msg: String,
    },
    #[serde(rename = "not-found-error")]
    RoomNotFound {
        msg: String,
    },
    UserJoined {
        email: String,
        id: PeerId,
        rooms: RoomIndex,
    },
    IncomingCall {
        from: PeerId,
        offer: SessionDescription,
    },
    CallAccepted {
        from: PeerId,
        answer: SessionDescription,
    },
    #[serde(rename = "renegotiation-needed-incoming")]
    RenegotiationIncoming {
        from: PeerId,
        offer: SessionDescription,
    },
    #[serde(rename = "final-negotiation")]
    RenegotiationFinal {
        from: PeerId,
        answer: SessionDescription,
    },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Wraps a relayed client message for delivery to its target.
    ///
    /// Returns `None` for room requests, which are never relayed.
    pub fn relayed(from: PeerId, msg: ClientMessage) -> Option<Self> {
        match msg {
            ClientMessage::CallOffer { offer, .. } => Some(Self::IncomingCall { from, offer }),
            ClientMessage::CallAnswer { answer, .. } => Some(Self::CallAccepted { from, answer }),
            ClientMessage::RenegotiationOffer { offer, .. } => {
                Some(Self::RenegotiationIncoming { from, offer })
            }
            ClientMessage::RenegotiationAnswer { answer, .. } => {
                Some(Self::RenegotiationFinal { from, answer })
            }
            ClientMessage::CreateRoom { .. } | ClientMessage::JoinRoom { .. } => None,
        }
    }
}
