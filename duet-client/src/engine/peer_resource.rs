use crate::media::LocalTrack;
use anyhow::Result;
use async_trait::async_trait;
use duet_core::SessionDescription;

/// Platform peer connection driven by the negotiation engine.
///
/// Events (remote tracks, state changes) are reported through the sender the
/// resource was built with.
#[async_trait]
pub trait PeerResource: Send + Sync + 'static {
    /// Creates a local offer and returns it as it should be sent.
    ///
    /// The offer must stay withdrawable through [`PeerResource::rollback`]
    /// until its answer is applied.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Creates and applies the answer to the applied remote offer.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Drops an unanswered local offer, or a remote offer that could not be
    /// answered, so that the next remote offer can be applied.
    async fn rollback(&self) -> Result<()>;

    async fn add_track(&self, track: LocalTrack) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
