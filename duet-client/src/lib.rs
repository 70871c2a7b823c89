mod channel;
mod client;
mod config;
mod engine;
mod media;
mod session;

pub use channel::*;
pub use client::{DuetClient, connect};
pub use config::ClientConfig;
pub use engine::*;
pub use media::*;
pub use session::*;
