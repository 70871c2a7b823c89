use duet_core::RoomIndex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Local copy of the last room snapshot, overwritten wholesale.
///
/// Informational only; nothing reads it back to make decisions.
#[derive(Debug, Clone)]
pub struct RoomIndexCache {
    path: PathBuf,
}

impl RoomIndexCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<RoomIndex> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(rooms) => Some(rooms),
            Err(e) => {
                warn!("Ignoring unreadable room cache {}: {e}", self.path.display());
                None
            }
        }
    }

    pub fn store(&self, rooms: &RoomIndex) {
        let text = match serde_json::to_string(rooms) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode room snapshot: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, text) {
            warn!("Failed to write room cache {}: {e}", self.path.display());
            return;
        }
        debug!("Stored {} room(s) in {}", rooms.len(), self.path.display());
    }
}
