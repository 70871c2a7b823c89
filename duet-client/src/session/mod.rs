mod call_state;
mod room_cache;
mod session_coordinator;
mod session_error;
mod session_event;
mod session_handle;

pub use call_state::*;
pub use room_cache::*;
pub use session_coordinator::*;
pub use session_error::*;
pub use session_event::*;
pub use session_handle::*;
