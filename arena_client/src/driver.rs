//! Per-frame orchestration.
//!
//! Every frame the remote side is ticked exactly once. While the session is
//! playing, local input is forwarded first and afterwards one snapshot per
//! roster entity is pulled, reconciled, mapped to a playback directive and
//! handed to the presentation sink. Outside of a match only the tick happens.

use arena_shared::{
    config::ClientConfig,
    math::Vec2,
    remote::{tracing_log_sink, Activity, EntityId, RemoteSimulation, RoomId, SnapshotError},
    render::{NullSink, PlaybackDirective, PresentationSink},
};
use tracing::{debug, info, warn};

use crate::{
    input::InputState,
    presentation::PresentationMapper,
    reconcile::MotionReconciler,
    session::{SessionController, SessionError, SessionEvent, SessionPhase},
};

/// Output for one entity on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityFrame {
    pub entity: EntityId,
    pub position: Vec2,
    pub heading: Vec2,
    pub activity: Activity,
    pub directive: PlaybackDirective,
}

/// Everything a frame produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: u64,
    /// Phase after this frame's update.
    pub phase: SessionPhase,
    pub events: Vec<SessionEvent>,
    pub entities: Vec<EntityFrame>,
    pub enemy: Option<Vec2>,
    /// Entities whose snapshot could not be read; their motion state is kept.
    pub missing: Vec<(EntityId, SnapshotError)>,
}

/// Drives the session, reconciler and presentation once per frame.
pub struct TickDriver<R: RemoteSimulation> {
    remote: R,
    cfg: ClientConfig,
    session: SessionController,
    reconciler: MotionReconciler,
    mapper: PresentationMapper,
    sink: Box<dyn PresentationSink>,
    frame: u64,
    paused: bool,
    shut_down: bool,
}

impl<R: RemoteSimulation> TickDriver<R> {
    pub fn new(remote: R, cfg: ClientConfig) -> Self {
        Self {
            reconciler: MotionReconciler::new(cfg.reconcile),
            mapper: PresentationMapper::new(cfg.presentation),
            remote,
            cfg,
            session: SessionController::new(),
            sink: Box::new(NullSink),
            frame: 0,
            paused: false,
            shut_down: false,
        }
    }

    /// Routes per-entity output to a presentation sink.
    pub fn with_sink(mut self, sink: Box<dyn PresentationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Starts the remote connection; its log lines go to `tracing`.
    pub fn initialize(&mut self) -> Result<(), SessionError> {
        info!(host = %self.cfg.server_host, port = self.cfg.server_port, "Initializing remote simulation");
        if self
            .remote
            .initialize(&self.cfg.server_host, self.cfg.server_port, tracing_log_sink())
        {
            Ok(())
        } else {
            warn!("Remote simulation refused to initialize");
            Err(SessionError::InitializeFailed)
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn reconciler(&self) -> &MotionReconciler {
        &self.reconciler
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    /// Round-trip time reported by the remote side, milliseconds.
    pub fn round_trip_time(&self) -> f32 {
        self.remote.round_trip_time()
    }

    pub fn create_and_join(&mut self, player_count: u8) -> Result<(), SessionError> {
        self.session.create_and_join(&mut self.remote, player_count)
    }

    pub fn join(&mut self, room: RoomId) -> Result<(), SessionError> {
        self.session.join(&mut self.remote, room)
    }

    pub fn start_match(&mut self) -> Result<(), SessionError> {
        self.session.start_match(&mut self.remote)
    }

    pub fn track(&mut self, entity: EntityId) {
        self.reconciler.track(entity);
    }

    pub fn forget(&mut self, entity: EntityId) {
        self.reconciler.forget(entity);
    }

    /// Makes the roster exactly entities `0..count`.
    pub fn sync_roster(&mut self, count: u8) {
        for id in self.reconciler.tracked() {
            if id.0 >= count {
                debug!(entity = ?id, "Entity left roster");
                self.reconciler.forget(id);
            }
        }
        for i in 0..count {
            let id = EntityId(i);
            if !self.reconciler.is_tracked(id) {
                debug!(entity = ?id, "Entity joined roster");
                self.reconciler.track(id);
            }
        }
    }

    /// Runs one frame. `now` is the frame time in seconds.
    pub fn tick(&mut self, input: InputState, now: f64) -> Frame {
        let was_playing = self.session.phase() == SessionPhase::Playing;
        if was_playing {
            let input = input.sanitized();
            self.remote.send_input(input.x, input.y, input.attack);
        }

        self.remote.tick();
        let events = self.session.update(&mut self.remote);

        let mut frame = Frame {
            index: self.frame,
            phase: self.session.phase(),
            events,
            entities: Vec::new(),
            enemy: None,
            missing: Vec::new(),
        };
        self.frame += 1;

        if frame.phase != SessionPhase::Playing {
            if !self.reconciler.is_empty() {
                info!(entities = self.reconciler.len(), "Match over, clearing roster");
                self.reconciler.clear();
            }
            return frame;
        }
        if !was_playing {
            return frame;
        }

        self.sync_roster(self.remote.players_count());
        self.present(&mut frame, now);

        if frame.index % 64 == 0 {
            debug!(
                frame = frame.index,
                entities = frame.entities.len(),
                missing = frame.missing.len(),
                "Frame"
            );
        }
        frame
    }

    fn present(&mut self, frame: &mut Frame, now: f64) {
        self.sink.begin_frame();

        for entity in self.reconciler.tracked() {
            let pulled = self
                .remote
                .receive_snapshot(entity.0)
                .and_then(|snap| snap.activity(entity.0).map(|activity| (snap, activity)));
            let (snap, activity) = match pulled {
                Ok(pulled) => pulled,
                Err(error) => {
                    warn!(entity = ?entity, error = %error, "Snapshot unavailable, keeping last state");
                    frame.missing.push((entity, error));
                    continue;
                }
            };

            let Some(motion) = self
                .reconciler
                .reconcile(entity, snap.position, Some(snap.direction), now)
            else {
                continue;
            };
            let directive = self.mapper.map(&activity, motion.velocity.len());

            self.sink
                .submit(entity, motion.position, motion.heading, directive);
            frame.entities.push(EntityFrame {
                entity,
                position: motion.position,
                heading: motion.heading,
                activity,
                directive,
            });
        }

        frame.enemy = self.remote.receive_enemy_position();

        if let Some(enemy) = frame.enemy {
            self.sink.submit_enemy(enemy);
        }
        self.sink.end_frame();
    }

    /// Forwards a pause once; repeated calls are no-ops.
    pub fn pause(&mut self) {
        if !self.paused {
            warn!("Pausing");
            self.remote.pause();
            self.paused = true;
        }
    }

    /// Forwards a resume once after a pause.
    pub fn resume(&mut self) {
        if self.paused {
            warn!("Resuming");
            self.remote.resume();
            self.paused = false;
        }
    }

    /// Shuts the remote side down; later calls do nothing.
    pub fn shutdown(&mut self) {
        if !self.shut_down {
            info!("Shutting down");
            self.remote.shutdown();
            self.reconciler.clear();
            self.shut_down = true;
        }
    }

    /// Human-readable status lines.
    pub fn status(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push(format!("Phase: {:?}", self.session.phase()));
        if let Some(room) = self.session.room_id() {
            out.push(format!("Room: {}", room));
        }
        out.push(format!("Frame: {}", self.frame));
        out.push(format!("RTT: {:.1} ms", self.round_trip_time()));
        out.push(format!("Tracked entities: {}", self.reconciler.len()));
        out.push(format!("Pending requests: {}", self.session.pending_count()));
        out
    }
}
