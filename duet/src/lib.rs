pub use duet_core::model::{PeerId, RoomId};

pub mod model {
    pub use duet_core::model::*;
    pub use duet_core::utils::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use duet_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use duet_client::*;
}
