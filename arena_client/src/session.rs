//! Session state machine.
//!
//! Tracks the connection/room/match lifecycle against the remote simulation:
//! - `Disconnected -> Connected` when the remote reports readiness
//! - `Connected -> RoomJoined` after a create-and-join or join completes
//! - `RoomJoined -> Waiting` after a start request completes
//! - `Waiting -> Playing` when the remote reports the match running
//! - any phase `-> Disconnected` when the remote reports a disconnect/error
//!
//! Requests complete asynchronously. Each callback handed to the remote only
//! posts a [`Completion`] onto a channel tagged with the session epoch; the
//! channel is drained in [`SessionController::update`]. A reset bumps the
//! epoch, so completions issued before it are recognised as stale and dropped.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use arena_shared::remote::{
    phase_code, RemoteSimulation, RequestCallback, RoomCreatedCallback, RoomId,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Not connected to the remote simulation.
    Disconnected,
    /// Connected, not in a room.
    Connected,
    /// In a room, match not started.
    RoomJoined,
    /// Match requested, remote side spinning it up.
    Waiting,
    /// Match running; snapshots are pulled every frame.
    Playing,
}

/// Request types that can be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    CreateAndJoin,
    Join,
    StartMatch,
}

/// An outstanding request to the remote simulation.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub kind: RequestKind,
    pub issued_at: Instant,
    /// Session epoch the request belongs to.
    pub epoch: u64,
    /// Room being joined, once known.
    pub room: Option<RoomId>,
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A request of this kind is already pending; nothing was sent.
    RequestAlreadyInFlight(RequestKind),
    /// The request is not valid in the current phase; nothing was sent.
    InvalidPhase {
        expected: SessionPhase,
        actual: SessionPhase,
    },
    /// Room creation or joining was refused by the remote side.
    RoomRequestFailed(RequestKind),
    /// Match start was refused by the remote side.
    StartRequestFailed,
    /// A completion arrived after the session was reset.
    StaleCompletion(RequestKind),
    /// The remote simulation could not be initialized.
    InitializeFailed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::RequestAlreadyInFlight(kind) => {
                write!(f, "{kind:?} request already in flight")
            }
            SessionError::InvalidPhase { expected, actual } => {
                write!(f, "request needs phase {expected:?}, session is {actual:?}")
            }
            SessionError::RoomRequestFailed(kind) => write!(f, "{kind:?} request failed"),
            SessionError::StartRequestFailed => write!(f, "start match request failed"),
            SessionError::StaleCompletion(kind) => {
                write!(f, "stale {kind:?} completion after session reset")
            }
            SessionError::InitializeFailed => write!(f, "remote simulation failed to initialize"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Something the caller may want to react to after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
    RoomJoined(RoomId),
    /// A request completed with a failure; the phase is unchanged.
    RequestFailed(SessionError),
    /// A completion from before the last reset was discarded.
    Stale(RequestKind),
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    RoomCreated(RoomId),
    Joined(bool),
    Started(bool),
}

#[derive(Debug, Clone, Copy)]
struct Completion {
    epoch: u64,
    kind: RequestKind,
    outcome: Outcome,
}

/// Connection/room/match state machine.
pub struct SessionController {
    phase: SessionPhase,
    room: Option<RoomId>,
    pending: HashMap<RequestKind, PendingRequest>,
    epoch: u64,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            phase: SessionPhase::Disconnected,
            room: None,
            pending: HashMap::new(),
            epoch: 0,
            completions_tx,
            completions_rx,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Room joined in this session, if any.
    pub fn room_id(&self) -> Option<RoomId> {
        self.room
    }

    pub fn pending(&self, kind: RequestKind) -> Option<&PendingRequest> {
        self.pending.get(&kind)
    }

    pub fn has_pending(&self, kind: RequestKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Creates a room for `player_count` players and joins it once created.
    pub fn create_and_join<R: RemoteSimulation + ?Sized>(
        &mut self,
        remote: &mut R,
        player_count: u8,
    ) -> Result<(), SessionError> {
        let kind = RequestKind::CreateAndJoin;
        self.admit(kind, SessionPhase::Connected)?;
        self.insert_pending(kind, None);
        info!(player_count, "Requesting room creation");
        remote.create_room(player_count, self.room_created_callback(kind));
        Ok(())
    }

    /// Joins an existing room.
    pub fn join<R: RemoteSimulation + ?Sized>(
        &mut self,
        remote: &mut R,
        room: RoomId,
    ) -> Result<(), SessionError> {
        let kind = RequestKind::Join;
        self.admit(kind, SessionPhase::Connected)?;
        self.insert_pending(kind, Some(room));
        info!(room = %room, "Requesting room join");
        remote.join_room(room, self.request_callback(kind, Outcome::Joined));
        Ok(())
    }

    /// Asks the remote side to start the match in the joined room.
    pub fn start_match<R: RemoteSimulation + ?Sized>(
        &mut self,
        remote: &mut R,
    ) -> Result<(), SessionError> {
        let kind = RequestKind::StartMatch;
        self.admit(kind, SessionPhase::RoomJoined)?;
        self.insert_pending(kind, self.room);
        info!(room = ?self.room, "Requesting match start");
        remote.start_match(self.request_callback(kind, Outcome::Started));
        Ok(())
    }

    /// Polls the remote phase and applies completions delivered since the last call.
    ///
    /// Call once per frame, after the remote tick.
    pub fn update<R: RemoteSimulation + ?Sized>(&mut self, remote: &mut R) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.poll_phase(remote.current_phase(), &mut events);
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(remote, completion, &mut events);
        }
        events
    }

    fn admit(&self, kind: RequestKind, expected: SessionPhase) -> Result<(), SessionError> {
        // Both room requests end in a join, so they share one slot.
        let blocking = match kind {
            RequestKind::CreateAndJoin | RequestKind::Join => {
                [RequestKind::CreateAndJoin, RequestKind::Join]
                    .into_iter()
                    .find(|k| self.pending.contains_key(k))
            }
            RequestKind::StartMatch => self.pending.contains_key(&kind).then_some(kind),
        };
        if let Some(in_flight) = blocking {
            debug!(?kind, ?in_flight, "Rejecting request already in flight");
            return Err(SessionError::RequestAlreadyInFlight(in_flight));
        }
        if self.phase != expected {
            return Err(SessionError::InvalidPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn insert_pending(&mut self, kind: RequestKind, room: Option<RoomId>) {
        self.pending.insert(
            kind,
            PendingRequest {
                kind,
                issued_at: Instant::now(),
                epoch: self.epoch,
                room,
            },
        );
    }

    fn room_created_callback(&self, kind: RequestKind) -> RoomCreatedCallback {
        let tx = self.completions_tx.clone();
        let epoch = self.epoch;
        Box::new(move |room| {
            post(&tx, Completion {
                epoch,
                kind,
                outcome: Outcome::RoomCreated(room),
            })
        })
    }

    fn request_callback(&self, kind: RequestKind, outcome: fn(bool) -> Outcome) -> RequestCallback {
        let tx = self.completions_tx.clone();
        let epoch = self.epoch;
        Box::new(move |success| {
            post(&tx, Completion {
                epoch,
                kind,
                outcome: outcome(success),
            })
        })
    }

    fn poll_phase(&mut self, code: i32, events: &mut Vec<SessionEvent>) {
        if !(phase_code::CONNECTED..=phase_code::PLAYING).contains(&code) {
            if self.phase != SessionPhase::Disconnected {
                warn!(code, phase = ?self.phase, "Remote reported disconnect");
                self.reset(events);
            }
            return;
        }

        match (self.phase, code) {
            (SessionPhase::Disconnected, _) => self.set_phase(SessionPhase::Connected, events),
            (SessionPhase::Waiting, phase_code::PLAYING) => {
                self.set_phase(SessionPhase::Playing, events)
            }
            (SessionPhase::Playing, phase_code::CONNECTED) => {
                info!(code, "Match ended, room closed");
                self.room = None;
                self.set_phase(SessionPhase::Connected, events);
            }
            (SessionPhase::Playing, phase_code::ROOM_JOINED) => {
                info!(code, "Match ended");
                self.set_phase(SessionPhase::RoomJoined, events);
            }
            (SessionPhase::Playing, phase_code::WAITING) => {
                info!(code, "Match ended, next one spinning up");
                self.set_phase(SessionPhase::Waiting, events);
            }
            _ => {}
        }
    }

    fn reset(&mut self, events: &mut Vec<SessionEvent>) {
        if !self.pending.is_empty() {
            info!(dropped = self.pending.len(), "Discarding pending requests");
        }
        self.epoch += 1;
        self.pending.clear();
        self.room = None;
        self.set_phase(SessionPhase::Disconnected, events);
    }

    fn set_phase(&mut self, to: SessionPhase, events: &mut Vec<SessionEvent>) {
        let from = self.phase;
        if from == to {
            return;
        }
        info!(?from, ?to, "Session phase changed");
        self.phase = to;
        events.push(SessionEvent::PhaseChanged { from, to });
    }

    fn fail(&mut self, error: SessionError, events: &mut Vec<SessionEvent>) {
        warn!(error = %error, phase = ?self.phase, "Request failed");
        events.push(SessionEvent::RequestFailed(error));
    }

    fn apply<R: RemoteSimulation + ?Sized>(
        &mut self,
        remote: &mut R,
        completion: Completion,
        events: &mut Vec<SessionEvent>,
    ) {
        let kind = completion.kind;
        if completion.epoch != self.epoch || !self.pending.contains_key(&kind) {
            warn!(error = %SessionError::StaleCompletion(kind), "Dropping completion");
            events.push(SessionEvent::Stale(kind));
            return;
        }

        match completion.outcome {
            Outcome::RoomCreated(room)
                if room.is_valid() && self.phase != SessionPhase::Connected =>
            {
                self.pending.remove(&kind);
                warn!(room = %room, phase = ?self.phase, "Room created outside Connected, not joining");
                self.fail(SessionError::RoomRequestFailed(kind), events);
            }
            Outcome::RoomCreated(room) if room.is_valid() => {
                info!(room = %room, "Room created, joining");
                if let Some(pending) = self.pending.get_mut(&kind) {
                    pending.room = Some(room);
                }
                remote.join_room(room, self.request_callback(kind, Outcome::Joined));
            }
            Outcome::RoomCreated(_) | Outcome::Joined(false) => {
                self.pending.remove(&kind);
                self.fail(SessionError::RoomRequestFailed(kind), events);
            }
            Outcome::Joined(true) => {
                let pending = self.pending.remove(&kind);
                let room = pending
                    .and_then(|p| p.room)
                    .unwrap_or_else(|| remote.room_id());
                if self.phase != SessionPhase::Connected {
                    warn!(room = %room, phase = ?self.phase, "Join completed outside Connected");
                    self.fail(SessionError::RoomRequestFailed(kind), events);
                    return;
                }
                self.room = Some(room);
                self.set_phase(SessionPhase::RoomJoined, events);
                events.push(SessionEvent::RoomJoined(room));
            }
            Outcome::Started(success) => {
                self.pending.remove(&kind);
                if !success {
                    self.fail(SessionError::StartRequestFailed, events);
                } else if self.phase == SessionPhase::RoomJoined {
                    self.set_phase(SessionPhase::Waiting, events);
                } else {
                    warn!(phase = ?self.phase, "Start completed outside RoomJoined, ignoring");
                }
            }
        }
    }
}

fn post(tx: &mpsc::UnboundedSender<Completion>, completion: Completion) {
    if tx.send(completion).is_err() {
        debug!(kind = ?completion.kind, "Session gone, completion discarded");
    }
}
