use duet_core::IceServerConfig;
use duet_core::utils::default_ice_servers;

/// Settings for the signaling service.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// ICE servers advertised to every client right after it connects.
    pub ice_servers: Vec<IceServerConfig>,
    /// Capacity of the hub command queue.
    pub hub_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            hub_queue: 256,
        }
    }
}
