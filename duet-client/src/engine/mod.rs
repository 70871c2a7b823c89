mod engine_event;
mod negotiation_engine;
mod negotiation_error;
mod peer_resource;
mod rtc_peer_resource;

pub use engine_event::*;
pub use negotiation_engine::*;
pub use negotiation_error::*;
pub use peer_resource::*;
pub use rtc_peer_resource::*;
