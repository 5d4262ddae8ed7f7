//! In-process authoritative simulation.
//!
//! Stands in for the networked host so the client core can run end to end
//! without a transport. It:
//! - Connects a few ticks after `initialize`
//! - Allocates rooms and completes requests on the following tick
//! - Spins the match up after a delay
//! - Steps players at a fixed timestep (local player from input, the rest wander)
//! - Moves an enemy around the arena
//!
//! Request completions are queued and dispatched from `tick`, never from the
//! issuing call.

use std::collections::{HashMap, VecDeque};

use arena_shared::{
    math::Vec2,
    remote::{
        phase_code, Activity, LogLevel, LogSink, RawSnapshot, RemoteSimulation, RequestCallback,
        RoomCreatedCallback, RoomId, SnapshotError,
    },
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Loopback tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopbackConfig {
    /// Ticks between `initialize` and reporting connected.
    pub connect_delay_ticks: u32,
    /// Ticks spent in the waiting phase after a successful start.
    pub spin_up_ticks: u32,
    /// Fixed simulation step, seconds.
    pub step_dt: f32,
    /// Steps an attack lasts before returning to idle.
    pub attack_steps: u32,
    /// Units per second at full input.
    pub move_speed: f32,
    pub max_players: u8,
    /// Reported round-trip time while connected, milliseconds.
    pub rtt_ms: f32,
    /// Seed for bot wandering.
    pub seed: u64,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            connect_delay_ticks: 2,
            spin_up_ticks: 3,
            step_dt: 1.0 / 60.0,
            attack_steps: 30,
            move_speed: 10.0,
            max_players: 8,
            rtt_ms: 0.0,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Input {
    x: f32,
    y: f32,
    attack: bool,
}

#[derive(Debug, Clone)]
struct SimPlayer {
    position: Vec2,
    direction: Vec2,
    action: Activity,
    action_step: u32,
    input: Input,
}

impl SimPlayer {
    fn spawn(slot: usize) -> Self {
        Self {
            position: Vec2::new(slot as f32 * 2.0, 0.0),
            direction: Vec2::UP,
            action: Activity::Idle,
            action_step: 0,
            input: Input::default(),
        }
    }
}

enum Deferred {
    Created(RoomCreatedCallback, RoomId),
    Joined(RequestCallback, Option<RoomId>),
    Started(RequestCallback, bool),
}

/// Loopback implementation of [`RemoteSimulation`].
pub struct LoopbackSimulation {
    cfg: LoopbackConfig,
    phase: i32,
    paused: bool,
    connect_in: Option<u32>,
    spin_up_in: Option<u32>,

    rooms: HashMap<RoomId, u8>,
    next_room: u32,
    room: RoomId,

    players: Vec<SimPlayer>,
    step: u32,
    enemy_angle: f32,

    deferred: VecDeque<Deferred>,
    rng: StdRng,
    log: Option<LogSink>,
}

impl LoopbackSimulation {
    pub fn new(cfg: LoopbackConfig) -> Self {
        let rng = StdRng::seed_from_u64(cfg.seed);
        Self {
            cfg,
            phase: phase_code::DISCONNECTED,
            paused: false,
            connect_in: None,
            spin_up_in: None,
            rooms: HashMap::new(),
            next_room: 1,
            room: RoomId::INVALID,
            players: Vec::new(),
            step: 0,
            enemy_angle: 0.0,
            deferred: VecDeque::new(),
            rng,
            log: None,
        }
    }

    /// Attack length in the time units snapshots report.
    pub fn attack_duration(&self) -> f32 {
        self.cfg.attack_steps as f32 * self.cfg.step_dt
    }

    /// Current simulation step.
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Drops the connection as if the host went away.
    pub fn drop_connection(&mut self) {
        self.write_log(LogLevel::Warning, "Connection lost");
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = phase_code::DISCONNECTED;
        self.connect_in = None;
        self.spin_up_in = None;
        self.room = RoomId::INVALID;
        self.players.clear();
        self.deferred.clear();
    }

    fn write_log(&self, level: LogLevel, message: &str) {
        if let Some(log) = &self.log {
            log(level, message);
        }
    }

    fn dispatch_deferred(&mut self) {
        let pending: Vec<Deferred> = self.deferred.drain(..).collect();
        for item in pending {
            match item {
                Deferred::Created(cb, room) => {
                    self.write_log(LogLevel::Info, &format!("Room created: {}", room.0));
                    cb(room);
                }
                Deferred::Joined(cb, room) => match room {
                    Some(room) if self.phase == phase_code::CONNECTED => {
                        let capacity = self.rooms.get(&room).copied().unwrap_or(1);
                        self.room = room;
                        self.players = (0..capacity as usize).map(SimPlayer::spawn).collect();
                        self.phase = phase_code::ROOM_JOINED;
                        self.write_log(LogLevel::Info, &format!("Joined room {}", room.0));
                        cb(true);
                    }
                    _ => cb(false),
                },
                Deferred::Started(cb, ok) => {
                    if ok && self.phase == phase_code::ROOM_JOINED {
                        self.phase = phase_code::WAITING;
                        self.spin_up_in = Some(self.cfg.spin_up_ticks);
                        cb(true);
                    } else {
                        cb(false);
                    }
                }
            }
        }
    }

    fn advance_phase(&mut self) {
        if let Some(n) = self.connect_in {
            if n == 0 {
                self.connect_in = None;
                self.phase = phase_code::CONNECTED;
                self.write_log(LogLevel::Info, "Connected");
            } else {
                self.connect_in = Some(n - 1);
            }
        }

        if let Some(n) = self.spin_up_in {
            if n == 0 {
                self.spin_up_in = None;
                self.phase = phase_code::PLAYING;
                self.step = 0;
                self.write_log(LogLevel::Info, "Match started");
            } else {
                self.spin_up_in = Some(n - 1);
            }
        }
    }

    fn simulate(&mut self) {
        let dt = self.cfg.step_dt;
        if self.step % 60 == 0 {
            for bot in self.players.iter_mut().skip(1) {
                bot.input = Input {
                    x: self.rng.gen_range(-1.0..=1.0),
                    y: self.rng.gen_range(-1.0..=1.0),
                    attack: self.rng.gen_bool(0.1),
                };
            }
        }

        let step = self.step;
        let attack_steps = self.cfg.attack_steps;
        let speed = self.cfg.move_speed;
        for player in &mut self.players {
            step_player(player, step, dt, speed, attack_steps);
        }

        self.enemy_angle += 0.5 * dt;
        self.step += 1;
    }
}

/// One fixed step of the player rules: input drives idle/moving, an attack
/// lunges along the facing direction and decays over `attack_steps`.
fn step_player(player: &mut SimPlayer, step: u32, dt: f32, speed: f32, attack_steps: u32) {
    let raw = Vec2::new(player.input.x, player.input.y);
    let magnitude = raw.len().min(1.0);
    let dir = raw.normalize_or_zero();
    let moving = magnitude > 0.02;
    let attack = player.input.attack;

    match player.action {
        Activity::Idle | Activity::Moving => {
            if attack {
                player.action = Activity::Attacking { phase_time: 0.0 };
                player.action_step = step + 1;
                if moving {
                    player.direction = dir;
                }
                player.position = player.position + player.direction * speed * dt;
            } else if moving {
                player.action = Activity::Moving;
                player.position = player.position + dir * magnitude * magnitude * speed * dt;
                player.direction = dir;
            } else if player.action == Activity::Moving {
                player.action = Activity::Idle;
                player.action_step = step + 1;
            }
        }
        Activity::Attacking { .. } => {
            let attack_step = (step + 1).saturating_sub(player.action_step);
            let t = attack_step as f32 / attack_steps as f32;
            let lunge = speed * (1.0 - t.clamp(0.0, 1.0));
            player.position = player.position + player.direction * lunge * dt;
            if attack_step >= attack_steps {
                player.action = Activity::Idle;
                player.action_step = step + 1;
            } else {
                player.action = Activity::Attacking {
                    phase_time: attack_step as f32 * dt,
                };
            }
        }
    }
}

impl RemoteSimulation for LoopbackSimulation {
    fn initialize(&mut self, host: &str, port: u16, log: LogSink) -> bool {
        self.log = Some(log);
        if host.is_empty() {
            self.write_log(LogLevel::Error, "No host given");
            return false;
        }
        self.write_log(LogLevel::Info, &format!("Connecting to {host}:{port}"));
        self.connect_in = Some(self.cfg.connect_delay_ticks);
        true
    }

    fn current_phase(&self) -> i32 {
        self.phase
    }

    fn round_trip_time(&self) -> f32 {
        if self.phase == phase_code::DISCONNECTED {
            0.0
        } else {
            self.cfg.rtt_ms
        }
    }

    fn room_id(&self) -> RoomId {
        self.room
    }

    fn players_count(&self) -> u8 {
        self.players.len() as u8
    }

    fn tick(&mut self) {
        if self.paused {
            return;
        }
        self.dispatch_deferred();
        self.advance_phase();
        if self.phase == phase_code::PLAYING {
            self.simulate();
        }
    }

    fn create_room(&mut self, player_count: u8, on_complete: RoomCreatedCallback) {
        let accepted = self.phase == phase_code::CONNECTED
            && player_count > 0
            && player_count <= self.cfg.max_players;
        let room = if accepted {
            let room = RoomId(self.next_room);
            self.next_room += 1;
            self.rooms.insert(room, player_count);
            room
        } else {
            RoomId::INVALID
        };
        debug!(player_count, room = %room, "Loopback create_room");
        self.deferred.push_back(Deferred::Created(on_complete, room));
    }

    fn join_room(&mut self, room: RoomId, on_complete: RequestCallback) {
        let target = self.rooms.contains_key(&room).then_some(room);
        debug!(room = %room, known = target.is_some(), "Loopback join_room");
        self.deferred.push_back(Deferred::Joined(on_complete, target));
    }

    fn start_match(&mut self, on_complete: RequestCallback) {
        let ok = self.phase == phase_code::ROOM_JOINED;
        self.deferred.push_back(Deferred::Started(on_complete, ok));
    }

    fn send_input(&mut self, x: f32, y: f32, attack: bool) {
        if let Some(local) = self.players.first_mut() {
            local.input = Input { x, y, attack };
        }
    }

    fn receive_snapshot(&mut self, index: u8) -> Result<RawSnapshot, SnapshotError> {
        if self.phase != phase_code::PLAYING {
            return Err(SnapshotError::Unavailable { index });
        }
        let player = self
            .players
            .get(index as usize)
            .ok_or(SnapshotError::Unavailable { index })?;
        let phase_time = match player.action {
            Activity::Attacking { phase_time } => phase_time,
            _ => 0.0,
        };
        Ok(RawSnapshot {
            position: player.position,
            direction: player.direction,
            state: player.action.code(),
            phase_time,
        })
    }

    fn receive_enemy_position(&mut self) -> Option<Vec2> {
        (self.phase == phase_code::PLAYING)
            .then(|| Vec2::new(self.enemy_angle.cos(), self.enemy_angle.sin()) * 5.0)
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.write_log(LogLevel::Warning, "Paused");
        }
    }

    fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.write_log(LogLevel::Warning, "Resumed");
        }
    }

    fn shutdown(&mut self) {
        self.write_log(LogLevel::Info, "Shutting down");
        self.reset();
        self.rooms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn quiet() -> LogSink {
        Box::new(|_, _| {})
    }

    fn connected() -> LoopbackSimulation {
        let mut sim = LoopbackSimulation::new(LoopbackConfig::default());
        assert!(sim.initialize("localhost", 1234, quiet()));
        for _ in 0..=LoopbackConfig::default().connect_delay_ticks {
            sim.tick();
        }
        assert_eq!(sim.current_phase(), phase_code::CONNECTED);
        sim
    }

    #[test]
    fn empty_host_fails_initialize() {
        let mut sim = LoopbackSimulation::new(LoopbackConfig::default());
        assert!(!sim.initialize("", 1234, quiet()));
        sim.tick();
        assert_eq!(sim.current_phase(), phase_code::DISCONNECTED);
    }

    #[test]
    fn create_room_completes_on_next_tick() {
        let mut sim = connected();
        let got = Arc::new(Mutex::new(None));
        let slot = got.clone();
        sim.create_room(2, Box::new(move |room| *slot.lock().unwrap() = Some(room)));
        assert!(got.lock().unwrap().is_none());

        sim.tick();
        let room = got.lock().unwrap().expect("completed");
        assert!(room.is_valid());
    }

    #[test]
    fn oversized_room_is_rejected_with_sentinel() {
        let mut sim = connected();
        let got = Arc::new(Mutex::new(None));
        let slot = got.clone();
        sim.create_room(200, Box::new(move |room| *slot.lock().unwrap() = Some(room)));
        sim.tick();
        assert_eq!(*got.lock().unwrap(), Some(RoomId::INVALID));
    }

    #[test]
    fn full_flow_reaches_playing_and_moves_local_player() {
        let mut sim = connected();
        sim.create_room(2, Box::new(|_| {}));
        sim.tick();
        sim.join_room(RoomId(1), Box::new(|ok| assert!(ok)));
        sim.tick();
        assert_eq!(sim.current_phase(), phase_code::ROOM_JOINED);
        assert_eq!(sim.players_count(), 2);

        sim.start_match(Box::new(|ok| assert!(ok)));
        sim.tick();
        assert_eq!(sim.current_phase(), phase_code::WAITING);
        for _ in 0..=LoopbackConfig::default().spin_up_ticks {
            sim.tick();
        }
        assert_eq!(sim.current_phase(), phase_code::PLAYING);

        let before = sim.receive_snapshot(0).unwrap().position;
        sim.send_input(1.0, 0.0, false);
        sim.tick();
        let snap = sim.receive_snapshot(0).unwrap();
        assert!(snap.position.x > before.x);
        assert_eq!(snap.state, Activity::Moving.code());
        assert!(sim.receive_enemy_position().is_some());
        assert!(sim.receive_snapshot(5).is_err());
    }

    #[test]
    fn attack_runs_its_course_then_idles() {
        let mut player = SimPlayer::spawn(0);
        player.input = Input {
            x: 0.0,
            y: 0.0,
            attack: true,
        };
        step_player(&mut player, 0, 1.0 / 60.0, 10.0, 30);
        assert!(matches!(player.action, Activity::Attacking { .. }));

        player.input.attack = false;
        for step in 1..=30 {
            step_player(&mut player, step, 1.0 / 60.0, 10.0, 30);
        }
        assert_eq!(player.action, Activity::Idle);
    }

    #[test]
    fn paused_simulation_does_not_advance() {
        let mut sim = LoopbackSimulation::new(LoopbackConfig::default());
        sim.initialize("localhost", 1, quiet());
        sim.pause();
        sim.pause();
        for _ in 0..10 {
            sim.tick();
        }
        assert_eq!(sim.current_phase(), phase_code::DISCONNECTED);
        sim.resume();
        for _ in 0..10 {
            sim.tick();
        }
        assert_eq!(sim.current_phase(), phase_code::CONNECTED);
    }
}
