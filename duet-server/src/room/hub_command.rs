use duet_core::{ClientMessage, PeerId};

/// Commands the websocket layer feeds into the room hub.
#[derive(Debug)]
pub enum HubCommand {
    /// A websocket connection was accepted and registered for output.
    Connect { peer_id: PeerId },

    /// A decoded client event.
    Message { peer_id: PeerId, msg: ClientMessage },

    /// The websocket connection went away.
    Disconnect { peer_id: PeerId },
}
