mod hub_command;
mod room_error;
mod room_hub;
mod room_registry;

pub use hub_command::*;
pub use room_error::*;
pub use room_hub::*;
pub use room_registry::*;
