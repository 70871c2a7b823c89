use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Caller-chosen room name.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub socket_id: PeerId,
}

/// Members of one room, in join order.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Room {
    pub users: Vec<User>,
}

impl Room {
    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.users.iter().any(|u| &u.socket_id == peer_id)
    }

    /// The most recently joined member other than `me`.
    pub fn latest_other(&self, me: &PeerId) -> Option<&User> {
        self.users.iter().rev().find(|u| &u.socket_id != me)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Informational snapshot of every occupied room.
pub type RoomIndex = BTreeMap<RoomId, Room>;
