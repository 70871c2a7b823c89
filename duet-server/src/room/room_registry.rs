use crate::room::RoomError;
use duet_core::{PeerId, Room, RoomId, RoomIndex, User};
use std::collections::HashMap;

/// Authoritative room membership.
///
/// A room exists from its creation until its last member leaves, and every
/// connection belongs to at most one room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RoomIndex,
    membership: HashMap<PeerId, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, room_id: RoomId, user: User) -> Result<(), RoomError> {
        if self.rooms.contains_key(&room_id) {
            return Err(RoomError::Duplicate(room_id));
        }
        if let Some(current) = self.membership.get(&user.socket_id) {
            return Err(RoomError::AlreadyJoined(current.clone()));
        }

        self.membership.insert(user.socket_id.clone(), room_id.clone());
        self.rooms.insert(room_id, Room { users: vec![user] });
        Ok(())
    }

    /// Adds `user` to an existing room and returns the member it pairs with,
    /// the most recently joined one before it.
    pub fn join(&mut self, room_id: RoomId, user: User) -> Result<Option<User>, RoomError> {
        if let Some(current) = self.membership.get(&user.socket_id) {
            return Err(RoomError::AlreadyJoined(current.clone()));
        }
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Err(RoomError::NotFound(room_id));
        };

        let partner = room.latest_other(&user.socket_id).cloned();
        self.membership.insert(user.socket_id.clone(), room_id);
        room.users.push(user);
        Ok(partner)
    }

    /// Removes the connection from its room, dropping the room once empty.
    pub fn leave(&mut self, peer_id: &PeerId) -> Option<RoomId> {
        let room_id = self.membership.remove(peer_id)?;

        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.users.retain(|u| &u.socket_id != peer_id);
            if room.is_empty() {
                self.rooms.remove(&room_id);
            }
        }
        Some(room_id)
    }

    pub fn room_of(&self, peer_id: &PeerId) -> Option<&RoomId> {
        self.membership.get(peer_id)
    }

    pub fn members(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn snapshot(&self) -> RoomIndex {
        self.rooms.clone()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
