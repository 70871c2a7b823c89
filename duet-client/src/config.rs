use duet_core::IceServerConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Websocket endpoint of the signaling service.
    pub server_url: String,
    /// Overrides the ICE servers advertised by the service.
    pub ice_servers: Option<Vec<IceServerConfig>>,
    /// Upper bound on ICE gathering before a description is sent.
    pub gather_timeout: Duration,
    /// How long to wait for the service greeting after connecting.
    pub handshake_timeout: Duration,
    /// Where the last room snapshot is kept between runs.
    pub cache_path: Option<PathBuf>,
    /// Gather loopback ICE candidates, for two clients on one host.
    pub loopback_candidates: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8000/ws".to_owned(),
            ice_servers: None,
            gather_timeout: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(5),
            cache_path: None,
            loopback_candidates: false,
        }
    }
}
