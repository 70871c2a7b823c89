use crate::engine::engine_event::{EngineEvent, ResourceEvent};
use crate::engine::negotiation_error::NegotiationError;
use crate::engine::peer_resource::PeerResource;
use crate::media::MediaStream;
use duet_core::SessionDescription;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    Stable,
    LocalOffer,
    RemoteOffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Renegotiation {
    Idle,
    /// Tracks changed while a round was open; raise once it settles.
    Deferred,
    /// Raised and not yet answered by a new offer.
    Queued,
}

/// Drives offer/answer over a single [`PeerResource`].
///
/// At most one local offer is outstanding, each answer is applied at most once
/// and every batch of new local tracks after the initial round yields exactly
/// one [`EngineEvent::RenegotiationNeeded`].
pub struct NegotiationEngine<R> {
    resource: Option<Arc<R>>,
    round: Round,
    initial_done: bool,
    attached: HashSet<String>,
    renegotiation: Renegotiation,
    ready: VecDeque<EngineEvent>,
    event_tx: mpsc::UnboundedSender<ResourceEvent>,
    event_rx: mpsc::UnboundedReceiver<ResourceEvent>,
}

impl<R: PeerResource> NegotiationEngine<R> {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            resource: None,
            round: Round::Stable,
            initial_done: false,
            attached: HashSet::new(),
            renegotiation: Renegotiation::Idle,
            ready: VecDeque::new(),
            event_tx,
            event_rx,
        }
    }

    /// Sender a resource reports its events through.
    pub fn event_sink(&self) -> mpsc::UnboundedSender<ResourceEvent> {
        self.event_tx.clone()
    }

    pub fn install(&mut self, resource: R) {
        self.resource = Some(Arc::new(resource));
    }

    pub fn has_resource(&self) -> bool {
        self.resource.is_some()
    }

    pub fn is_offer_outstanding(&self) -> bool {
        self.round == Round::LocalOffer
    }

    pub fn initial_round_complete(&self) -> bool {
        self.initial_done
    }

    pub fn attached_track_count(&self) -> usize {
        self.attached.len()
    }

    fn resource(&self) -> Result<Arc<R>, NegotiationError> {
        self.resource.clone().ok_or(NegotiationError::NoResource)
    }

    /// Creates a local offer to send to the peer.
    pub async fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        let resource = self.resource()?;
        if self.round == Round::LocalOffer {
            return Err(NegotiationError::OfferOutstanding);
        }

        let offer = resource
            .create_offer()
            .await
            .map_err(|e| NegotiationError::Negotiation(format!("{e:#}")))?;

        self.round = Round::LocalOffer;
        // The offer carries every attached track.
        self.renegotiation = Renegotiation::Idle;
        debug!("Local offer outstanding");
        Ok(offer)
    }

    /// Applies a remote offer and returns the local answer.
    pub async fn create_answer(
        &mut self,
        remote_offer: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        let resource = self.resource()?;
        if !remote_offer.is_offer() {
            return Err(NegotiationError::InvalidOffer(
                "expected an offer, got an answer".to_owned(),
            ));
        }
        if self.round == Round::LocalOffer {
            return Err(NegotiationError::InvalidOffer(
                "a local offer is outstanding".to_owned(),
            ));
        }

        resource
            .set_remote_description(remote_offer)
            .await
            .map_err(|e| NegotiationError::InvalidOffer(format!("{e:#}")))?;
        self.round = Round::RemoteOffer;

        let answer = match resource.create_answer().await {
            Ok(answer) => answer,
            Err(e) => {
                self.abandon_remote_offer(&resource).await;
                return Err(NegotiationError::Negotiation(format!("{e:#}")));
            }
        };

        self.settle();
        Ok(answer)
    }

    /// Applies the answer to the outstanding local offer.
    ///
    /// A rejected answer leaves the offer outstanding.
    pub async fn apply_remote_answer(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let resource = self.resource()?;
        if self.round != Round::LocalOffer {
            return Err(NegotiationError::NoOutstandingOffer);
        }
        if !answer.is_answer() {
            return Err(NegotiationError::InvalidAnswer(
                "expected an answer, got an offer".to_owned(),
            ));
        }

        resource
            .set_remote_description(answer)
            .await
            .map_err(|e| NegotiationError::InvalidAnswer(format!("{e:#}")))?;

        self.settle();
        Ok(())
    }

    /// Withdraws the outstanding local offer.
    pub async fn rollback(&mut self) -> Result<(), NegotiationError> {
        let resource = self.resource()?;
        if self.round != Round::LocalOffer {
            return Err(NegotiationError::NoOutstandingOffer);
        }

        resource
            .rollback()
            .await
            .map_err(|e| NegotiationError::Negotiation(format!("{e:#}")))?;
        self.round = Round::Stable;

        // A withdrawn renegotiation offer still owes the peer our tracks.
        if self.initial_done {
            self.renegotiation = Renegotiation::Deferred;
        }
        info!("Local offer rolled back");
        Ok(())
    }

    /// Adds the stream's tracks that are not attached yet.
    ///
    /// Returns how many tracks were added.
    pub async fn attach_local_tracks(
        &mut self,
        stream: &MediaStream,
    ) -> Result<usize, NegotiationError> {
        let resource = self.resource()?;

        let mut added = 0;
        for (track, id) in stream.tracks().iter().zip(stream.track_ids()) {
            if self.attached.contains(&id) {
                debug!("Track {id} already attached");
                continue;
            }
            resource
                .add_track(Arc::clone(track))
                .await
                .map_err(|e| NegotiationError::Negotiation(format!("{e:#}")))?;
            self.attached.insert(id);
            added += 1;
        }

        if added > 0 {
            debug!("Attached {added} local track(s)");
            self.request_renegotiation();
        }
        Ok(added)
    }

    /// Puts back a renegotiation request its owner could not act on yet.
    ///
    /// It is raised again when the next round settles.
    pub fn defer_renegotiation(&mut self) {
        if self.renegotiation == Renegotiation::Queued {
            debug!("Renegotiation deferred");
            self.renegotiation = Renegotiation::Deferred;
        }
    }

    /// Next event for the owner. Cancel safe.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        if let Some(evt) = self.ready.pop_front() {
            return Some(evt);
        }
        self.event_rx.recv().await.map(EngineEvent::from)
    }

    /// Next event if one is already pending.
    pub fn try_next_event(&mut self) -> Option<EngineEvent> {
        self.ready
            .pop_front()
            .or_else(|| self.event_rx.try_recv().ok().map(EngineEvent::from))
    }

    /// Closes the resource and forgets all negotiation state.
    pub async fn release(&mut self) {
        if let Some(resource) = self.resource.take() {
            if let Err(e) = resource.close().await {
                warn!("Failed to close peer connection: {e:#}");
            }
            info!("Peer connection released");
        }
        self.round = Round::Stable;
        self.initial_done = false;
        self.attached.clear();
        self.renegotiation = Renegotiation::Idle;
        self.ready.clear();
    }

    fn request_renegotiation(&mut self) {
        match self.renegotiation {
            Renegotiation::Queued => debug!("Renegotiation already queued"),
            _ if self.initial_done && self.round == Round::Stable => {
                self.renegotiation = Renegotiation::Queued;
                self.ready.push_back(EngineEvent::RenegotiationNeeded);
            }
            _ => self.renegotiation = Renegotiation::Deferred,
        }
    }

    fn settle(&mut self) {
        self.round = Round::Stable;
        self.initial_done = true;
        if self.renegotiation == Renegotiation::Deferred {
            self.renegotiation = Renegotiation::Idle;
            self.request_renegotiation();
        }
    }

    async fn abandon_remote_offer(&mut self, resource: &R) {
        if let Err(e) = resource.rollback().await {
            warn!("Failed to roll back remote offer: {e:#}");
        }
        self.round = Round::Stable;
    }
}

impl<R: PeerResource> Default for NegotiationEngine<R> {
    fn default() -> Self {
        Self::new()
    }
}
