use crate::channel::{SignalingChannel, Subscription};
use crate::engine::{EngineEvent, NegotiationEngine, NegotiationError, PeerResource, PeerState};
use crate::media::{MediaCapture, MediaSource, MediaStream};
use crate::session::call_state::CallState;
use crate::session::room_cache::RoomIndexCache;
use crate::session::session_error::SessionError;
use crate::session::session_event::{SessionCommand, SessionEvent};
use duet_core::{ClientMessage, PeerId, RoomId, RoomIndex, ServerMessage, SessionDescription};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-client orchestrator of room membership, media and negotiation.
///
/// Owns the engine and the local stream and reacts to one event at a time.
/// Offer collisions are settled by peer id: the side with the smaller id
/// withdraws its offer and answers, the other ignores the incoming one.
pub struct SessionCoordinator<C, R, S> {
    channel: C,
    subscription: Option<Subscription>,
    engine: NegotiationEngine<R>,
    media: MediaCapture<S>,
    state: CallState,
    local_id: Option<PeerId>,
    identity: Option<String>,
    room: Option<RoomId>,
    rooms: RoomIndex,
    call_stream: Option<MediaStream>,
    cache: Option<RoomIndexCache>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl<C, R, S> SessionCoordinator<C, R, S>
where
    C: SignalingChannel,
    R: PeerResource,
    S: MediaSource,
{
    pub fn new(
        channel: C,
        engine: NegotiationEngine<R>,
        media: MediaCapture<S>,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let subscription = channel.subscribe();
        Self {
            channel,
            subscription: Some(subscription),
            engine,
            media,
            state: CallState::Idle,
            local_id: None,
            identity: None,
            room: None,
            rooms: RoomIndex::new(),
            call_stream: None,
            cache: None,
            events_tx,
        }
    }

    /// Sets the id the service assigned, when the greeting was consumed elsewhere.
    pub fn with_local_id(mut self, local_id: PeerId) -> Self {
        self.local_id = Some(local_id);
        self
    }

    pub fn with_cache(mut self, cache: RoomIndexCache) -> Self {
        if let Some(rooms) = cache.load() {
            debug!("Loaded {} cached room(s)", rooms.len());
            self.rooms = rooms;
        }
        self.cache = Some(cache);
        self
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn engine(&self) -> &NegotiationEngine<R> {
        &self.engine
    }

    pub fn media_acquired(&self) -> bool {
        self.media.is_acquired()
    }

    pub async fn request_create_room(
        &mut self,
        email: String,
        room: RoomId,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.state != CallState::Idle {
            return Err(SessionError::AlreadyInRoom);
        }

        info!("Creating room {room} as {email}");
        self.identity = Some(email.clone());
        self.send(ClientMessage::CreateRoom { email, room })
    }

    pub async fn request_join_room(
        &mut self,
        email: String,
        room: RoomId,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.state != CallState::Idle {
            return Err(SessionError::AlreadyInRoom);
        }

        info!("Joining room {room} as {email}");
        self.identity = Some(email.clone());
        self.send(ClientMessage::JoinRoom { email, room })
    }

    pub async fn on_joined(
        &mut self,
        room: RoomId,
        email: String,
        rooms: RoomIndex,
    ) -> Result<(), SessionError> {
        if self.state != CallState::Idle {
            return Err(self.unexpected("joined"));
        }

        info!("Joined room {room}");
        self.identity = Some(email);
        self.room = Some(room.clone());
        self.remember_rooms(rooms.clone());
        self.set_state(CallState::AwaitingRemote);
        self.emit(SessionEvent::Joined { room, rooms });
        Ok(())
    }

    /// Create or join was refused. The state does not change.
    pub fn on_room_error(&mut self, msg: String) {
        warn!("Room request refused: {msg}");
        self.emit(SessionEvent::RoomError { msg });
    }

    pub async fn on_remote_joined(
        &mut self,
        email: String,
        remote_id: PeerId,
        rooms: RoomIndex,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.remember_rooms(rooms);

        if self.local_id.as_ref() == Some(&remote_id) {
            debug!("Ignoring announcement of ourselves");
            return Ok(());
        }

        match &self.state {
            CallState::AwaitingRemote | CallState::Paired { .. } => {
                info!("{email} ({remote_id}) is in the room");
                self.set_state(CallState::Paired {
                    remote: remote_id.clone(),
                });
            }
            state if state.in_call() => {
                info!("{email} ({remote_id}) joined during the call, keeping the current remote");
            }
            _ => return Err(self.unexpected("user-joined")),
        }

        self.emit(SessionEvent::RemoteJoined {
            email,
            id: remote_id,
        });
        Ok(())
    }

    /// Offers a call to the remote participant.
    ///
    /// Nothing is sent if the local stream cannot be acquired.
    pub async fn initiate_call(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        let remote = match &self.state {
            CallState::Paired { remote } => remote.clone(),
            state if state.in_call() => return Err(self.unexpected("call request")),
            _ => return Err(SessionError::NoRemotePeer),
        };

        let stream = self.media.stream().await?;
        let offer = self.engine.create_offer().await?;
        if let Err(e) = self.send(ClientMessage::CallOffer {
            to: remote.clone(),
            offer,
        }) {
            self.withdraw_offer().await;
            return Err(e);
        }

        info!("Calling {remote}");
        self.start_call_stream(stream);
        self.set_state(CallState::Offering { remote });
        Ok(())
    }

    pub async fn on_incoming_call(
        &mut self,
        from: PeerId,
        offer: SessionDescription,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let collision = match &self.state {
            CallState::AwaitingRemote | CallState::Paired { .. } => false,
            CallState::Connected { remote } if remote == &from => false,
            CallState::Offering { remote } if remote == &from => true,
            _ => return Err(self.unexpected("incoming-call")),
        };

        if collision {
            if !self.yields_to(&from) {
                info!("Offer collision with {from}, keeping ours");
                return Ok(());
            }
            info!("Offer collision with {from}, withdrawing ours");
            self.engine.rollback().await?;
            self.call_stream = None;
            self.set_state(CallState::Paired {
                remote: from.clone(),
            });
        }

        let stream = self.media.stream().await?;
        let answer = self.engine.create_answer(offer).await?;
        self.send(ClientMessage::CallAnswer {
            to: from.clone(),
            answer,
        })?;

        info!("Answered call from {from}");
        self.start_call_stream(stream);
        self.set_state(CallState::Answering { remote: from });
        Ok(())
    }

    pub async fn on_call_accepted(
        &mut self,
        from: PeerId,
        answer: SessionDescription,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let remote = match &self.state {
            CallState::Offering { remote } if remote == &from => remote.clone(),
            CallState::Offering { .. } => return Err(self.unexpected("call-accepted")),
            _ => return Err(NegotiationError::NoOutstandingOffer.into()),
        };

        if let Err(e) = self.engine.apply_remote_answer(answer).await {
            warn!("Answer from {from} rejected: {e}");
            self.withdraw_offer().await;
            self.call_stream = None;
            self.set_state(CallState::Paired { remote });
            return Err(e.into());
        }

        info!("Call accepted by {remote}");
        self.set_state(CallState::Connected { remote });
        self.attach_call_stream().await
    }

    /// Sends the local tracks to the remote; the callee's way of accepting.
    pub async fn send_streams(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        let remote = match &self.state {
            CallState::Answering { remote }
            | CallState::Connected { remote }
            | CallState::RenegotiatingOffer { remote } => remote.clone(),
            _ => return Err(self.unexpected("send-streams")),
        };

        self.attach_call_stream().await?;
        if matches!(self.state, CallState::Answering { .. }) {
            self.set_state(CallState::Connected { remote });
        }
        Ok(())
    }

    pub async fn on_renegotiation_needed(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        let remote = match &self.state {
            CallState::Connected { remote } | CallState::Answering { remote } => remote.clone(),
            state => {
                debug!("Renegotiation postponed while {state}");
                self.engine.defer_renegotiation();
                return Ok(());
            }
        };

        let offer = match self.engine.create_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                self.engine.defer_renegotiation();
                return Err(e.into());
            }
        };
        if let Err(e) = self.send(ClientMessage::RenegotiationOffer {
            to: remote.clone(),
            offer,
        }) {
            self.withdraw_offer().await;
            return Err(e);
        }

        debug!("Renegotiating with {remote}");
        self.set_state(CallState::RenegotiatingOffer { remote });
        Ok(())
    }

    pub async fn on_renegotiation_offer(
        &mut self,
        from: PeerId,
        offer: SessionDescription,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let (remote, collision) = match &self.state {
            CallState::Connected { remote } | CallState::Answering { remote }
                if remote == &from =>
            {
                (remote.clone(), false)
            }
            CallState::RenegotiatingOffer { remote } if remote == &from => (remote.clone(), true),
            _ => return Err(self.unexpected("renegotiation offer")),
        };

        let mut settled = self.state.clone();
        if collision {
            if !self.yields_to(&from) {
                info!("Renegotiation collision with {from}, keeping ours");
                return Ok(());
            }
            info!("Renegotiation collision with {from}, withdrawing ours");
            self.engine.rollback().await?;
            settled = CallState::Connected {
                remote: remote.clone(),
            };
        }

        self.set_state(CallState::RenegotiatingAnswer {
            remote: remote.clone(),
        });
        let answer = match self.engine.create_answer(offer).await {
            Ok(answer) => answer,
            Err(e) => {
                self.set_state(settled);
                return Err(e.into());
            }
        };

        let sent = self.send(ClientMessage::RenegotiationAnswer { to: remote, answer });
        self.set_state(settled);
        sent
    }

    pub async fn on_renegotiation_answer(
        &mut self,
        from: PeerId,
        answer: SessionDescription,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let remote = match &self.state {
            CallState::RenegotiatingOffer { remote } if remote == &from => remote.clone(),
            CallState::RenegotiatingOffer { .. } => {
                return Err(self.unexpected("renegotiation answer"));
            }
            _ => return Err(NegotiationError::NoOutstandingOffer.into()),
        };

        if let Err(e) = self.engine.apply_remote_answer(answer).await {
            warn!("Renegotiation answer from {from} rejected: {e}");
            self.withdraw_offer().await;
            self.set_state(CallState::Connected { remote });
            return Err(e.into());
        }

        debug!("Renegotiation with {remote} complete");
        self.set_state(CallState::Connected { remote });
        Ok(())
    }

    /// Releases the connection and the local stream. Further events are ignored.
    pub async fn shutdown(&mut self) {
        if self.state == CallState::Ended {
            return;
        }

        self.engine.release().await;
        self.media.release();
        self.call_stream = None;
        self.subscription = None;
        self.set_state(CallState::Ended);
        info!("Session ended");
    }

    pub async fn handle_server_message(&mut self, msg: ServerMessage) -> Result<(), SessionError> {
        if self.state == CallState::Ended {
            debug!("Session ended, dropping {:?}", msg);
            return Ok(());
        }

        match msg {
            ServerMessage::Welcome { peer_id } => {
                info!("Connected as {peer_id}");
                self.local_id = Some(peer_id.clone());
                self.emit(SessionEvent::Welcome { peer_id });
                Ok(())
            }
            ServerMessage::IceConfig { ice_servers } => {
                debug!("Service offers {} ICE server(s)", ice_servers.len());
                Ok(())
            }
            ServerMessage::Joined { room, email, rooms } => self.on_joined(room, email, rooms).await,
            ServerMessage::DuplicateRoom { msg } | ServerMessage::RoomNotFound { msg } => {
                self.on_room_error(msg);
                Ok(())
            }
            ServerMessage::UserJoined { email, id, rooms } => {
                self.on_remote_joined(email, id, rooms).await
            }
            ServerMessage::IncomingCall { from, offer } => self.on_incoming_call(from, offer).await,
            ServerMessage::CallAccepted { from, answer } => {
                self.on_call_accepted(from, answer).await
            }
            ServerMessage::RenegotiationIncoming { from, offer } => {
                self.on_renegotiation_offer(from, offer).await
            }
            ServerMessage::RenegotiationFinal { from, answer } => {
                self.on_renegotiation_answer(from, answer).await
            }
        }
    }

    pub async fn handle_engine_event(&mut self, evt: EngineEvent) -> Result<(), SessionError> {
        match evt {
            EngineEvent::RenegotiationNeeded => self.on_renegotiation_needed().await,
            EngineEvent::RemoteTrack(handle) => {
                info!(
                    "Remote {:?} track {} on stream {}",
                    handle.kind, handle.track_id, handle.stream_id
                );
                self.emit(SessionEvent::RemoteTrack(handle));
                Ok(())
            }
            EngineEvent::StateChanged(peer_state) => {
                if matches!(peer_state, PeerState::Failed | PeerState::Disconnected) {
                    warn!("Peer connection is {:?}", peer_state);
                }
                self.emit(SessionEvent::PeerState(peer_state));
                Ok(())
            }
        }
    }

    /// Handles engine events that are already pending.
    pub async fn process_engine_events(&mut self) -> Result<(), SessionError> {
        while let Some(evt) = self.engine.try_next_event() {
            self.handle_engine_event(evt).await?;
        }
        Ok(())
    }

    pub async fn handle_command(&mut self, cmd: SessionCommand) -> Result<(), SessionError> {
        match cmd {
            SessionCommand::CreateRoom { email, room } => {
                self.request_create_room(email, room).await
            }
            SessionCommand::JoinRoom { email, room } => self.request_join_room(email, room).await,
            SessionCommand::Call => self.initiate_call().await,
            SessionCommand::SendStreams => self.send_streams().await,
            SessionCommand::Shutdown => {
                self.shutdown().await;
                Ok(())
            }
        }
    }

    /// Processes commands, inbound events and engine events until shut down
    /// or the channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!("Session started");

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else {
                        self.shutdown().await;
                        break;
                    };
                    if let Err(e) = self.handle_command(cmd).await {
                        warn!("Command failed: {e}");
                    }
                    if self.state == CallState::Ended {
                        break;
                    }
                }

                msg = next_message(&mut self.subscription) => {
                    let Some(msg) = msg else {
                        info!("Signaling channel closed");
                        self.shutdown().await;
                        break;
                    };
                    if let Err(e) = self.handle_server_message(msg).await {
                        warn!("Failed to handle server event: {e}");
                    }
                }

                evt = self.engine.next_event() => {
                    let Some(evt) = evt else { break };
                    if let Err(e) = self.handle_engine_event(evt).await {
                        warn!("Failed to handle engine event: {e}");
                    }
                }
            }
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        match self.state {
            CallState::Ended => Err(SessionError::Ended),
            _ => Ok(()),
        }
    }

    fn unexpected(&self, event: &'static str) -> SessionError {
        SessionError::UnexpectedEvent {
            event,
            state: self.state.name(),
        }
    }

    fn yields_to(&self, remote: &PeerId) -> bool {
        match &self.local_id {
            Some(local) => local < remote,
            None => true,
        }
    }

    fn send(&self, msg: ClientMessage) -> Result<(), SessionError> {
        self.channel.send(msg)?;
        Ok(())
    }

    fn emit(&self, evt: SessionEvent) {
        let _ = self.events_tx.send(evt);
    }

    fn set_state(&mut self, next: CallState) {
        if self.state == next {
            return;
        }
        debug!("Call state {} -> {}", self.state, next);
        self.state = next.clone();
        self.emit(SessionEvent::StateChanged(next));
    }

    fn remember_rooms(&mut self, rooms: RoomIndex) {
        if let Some(cache) = &self.cache {
            cache.store(&rooms);
        }
        self.rooms = rooms;
    }

    fn start_call_stream(&mut self, stream: MediaStream) {
        self.call_stream = Some(stream.clone());
        self.emit(SessionEvent::LocalStream(stream));
    }

    async fn attach_call_stream(&mut self) -> Result<(), SessionError> {
        let stream = match &self.call_stream {
            Some(stream) => stream.clone(),
            None => {
                let stream = self.media.stream().await?;
                self.start_call_stream(stream.clone());
                stream
            }
        };

        let added = self.engine.attach_local_tracks(&stream).await?;
        debug!("Attached {added} new track(s) from stream {}", stream.id());
        Ok(())
    }

    async fn withdraw_offer(&mut self) {
        if let Err(e) = self.engine.rollback().await {
            warn!("Failed to withdraw local offer: {e}");
        }
    }
}

async fn next_message(subscription: &mut Option<Subscription>) -> Option<ServerMessage> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
