//! Hand-driven remote simulation.
//!
//! Nothing happens on its own: tests set the phase code, stage snapshots and
//! decide when (and how) each pending request completes. Every call is
//! counted so tests can assert on exactly what reached the remote side.

use std::collections::{HashMap, VecDeque};

use arena_shared::{
    math::Vec2,
    remote::{
        phase_code, LogLevel, LogSink, RawSnapshot, RemoteSimulation, RequestCallback,
        RoomCreatedCallback, RoomId, SnapshotError,
    },
};

/// Counts of calls made into a [`ScriptedRemote`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub initialize: u32,
    pub tick: u32,
    pub create_room: u32,
    pub join_room: u32,
    pub start_match: u32,
    pub send_input: u32,
    pub receive_snapshot: u32,
    pub pause: u32,
    pub resume: u32,
    pub shutdown: u32,
}

/// Manually scripted collaborator for tests.
pub struct ScriptedRemote {
    pub calls: CallLog,
    pub phase: i32,
    pub rtt: f32,
    pub room: RoomId,
    pub players: u8,
    pub initialize_result: bool,
    pub enemy: Option<Vec2>,
    /// Inputs in the order they were sent.
    pub inputs: Vec<(f32, f32, bool)>,
    /// Rooms passed to `join_room`, in order.
    pub joined_rooms: Vec<RoomId>,
    snapshots: HashMap<u8, Result<RawSnapshot, SnapshotError>>,
    create_callbacks: VecDeque<RoomCreatedCallback>,
    join_callbacks: VecDeque<RequestCallback>,
    start_callbacks: VecDeque<RequestCallback>,
    log: Option<LogSink>,
}

impl Default for ScriptedRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self {
            calls: CallLog::default(),
            phase: phase_code::DISCONNECTED,
            rtt: 0.0,
            room: RoomId::INVALID,
            players: 0,
            initialize_result: true,
            enemy: None,
            inputs: Vec::new(),
            joined_rooms: Vec::new(),
            snapshots: HashMap::new(),
            create_callbacks: VecDeque::new(),
            join_callbacks: VecDeque::new(),
            start_callbacks: VecDeque::new(),
            log: None,
        }
    }

    /// Starts in the given phase code.
    pub fn with_phase(phase: i32) -> Self {
        Self {
            phase,
            ..Self::new()
        }
    }

    pub fn set_snapshot(&mut self, index: u8, snapshot: RawSnapshot) {
        self.snapshots.insert(index, Ok(snapshot));
    }

    pub fn fail_snapshot(&mut self, index: u8) {
        self.snapshots
            .insert(index, Err(SnapshotError::Unavailable { index }));
    }

    /// Convenience for staging a plain position sample.
    pub fn set_position(&mut self, index: u8, position: Vec2, state: i32, phase_time: f32) {
        self.set_snapshot(
            index,
            RawSnapshot {
                position,
                direction: Vec2::ZERO,
                state,
                phase_time,
            },
        );
    }

    /// Pending completions per request type: (create, join, start).
    pub fn pending_callbacks(&self) -> (usize, usize, usize) {
        (
            self.create_callbacks.len(),
            self.join_callbacks.len(),
            self.start_callbacks.len(),
        )
    }

    /// Resolves the oldest `create_room`. Returns `false` if none was pending.
    pub fn complete_create(&mut self, room: RoomId) -> bool {
        match self.create_callbacks.pop_front() {
            Some(cb) => {
                cb(room);
                true
            }
            None => false,
        }
    }

    /// Resolves the oldest `join_room`. On success the room becomes current.
    pub fn complete_join(&mut self, success: bool) -> bool {
        match self.join_callbacks.pop_front() {
            Some(cb) => {
                if success {
                    if let Some(room) = self.joined_rooms.last() {
                        self.room = *room;
                    }
                    self.phase = phase_code::ROOM_JOINED;
                }
                cb(success);
                true
            }
            None => false,
        }
    }

    /// Resolves the oldest `start_match`.
    pub fn complete_start(&mut self, success: bool) -> bool {
        match self.start_callbacks.pop_front() {
            Some(cb) => {
                if success {
                    self.phase = phase_code::WAITING;
                }
                cb(success);
                true
            }
            None => false,
        }
    }

    /// Emits a line through the sink handed to `initialize`.
    pub fn emit_log(&self, code: i32, message: &str) {
        if let Some(log) = &self.log {
            log(LogLevel::from_code(code), message);
        }
    }
}

impl RemoteSimulation for ScriptedRemote {
    fn initialize(&mut self, _host: &str, _port: u16, log: LogSink) -> bool {
        self.calls.initialize += 1;
        self.log = Some(log);
        self.initialize_result
    }

    fn current_phase(&self) -> i32 {
        self.phase
    }

    fn round_trip_time(&self) -> f32 {
        self.rtt
    }

    fn room_id(&self) -> RoomId {
        self.room
    }

    fn players_count(&self) -> u8 {
        self.players
    }

    fn tick(&mut self) {
        self.calls.tick += 1;
    }

    fn create_room(&mut self, _player_count: u8, on_complete: RoomCreatedCallback) {
        self.calls.create_room += 1;
        self.create_callbacks.push_back(on_complete);
    }

    fn join_room(&mut self, room: RoomId, on_complete: RequestCallback) {
        self.calls.join_room += 1;
        self.joined_rooms.push(room);
        self.join_callbacks.push_back(on_complete);
    }

    fn start_match(&mut self, on_complete: RequestCallback) {
        self.calls.start_match += 1;
        self.start_callbacks.push_back(on_complete);
    }

    fn send_input(&mut self, x: f32, y: f32, attack: bool) {
        self.calls.send_input += 1;
        self.inputs.push((x, y, attack));
    }

    fn receive_snapshot(&mut self, index: u8) -> Result<RawSnapshot, SnapshotError> {
        self.calls.receive_snapshot += 1;
        self.snapshots
            .get(&index)
            .cloned()
            .unwrap_or(Err(SnapshotError::Unavailable { index }))
    }

    fn receive_enemy_position(&mut self) -> Option<Vec2> {
        self.enemy
    }

    fn pause(&mut self) {
        self.calls.pause += 1;
    }

    fn resume(&mut self) {
        self.calls.resume += 1;
    }

    fn shutdown(&mut self) {
        self.calls.shutdown += 1;
        self.phase = phase_code::DISCONNECTED;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn completions_are_deferred_until_resolved() {
        let mut remote = ScriptedRemote::with_phase(phase_code::CONNECTED);
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        remote.create_room(2, Box::new(move |room| *slot.lock().unwrap() = Some(room)));

        assert_eq!(remote.pending_callbacks(), (1, 0, 0));
        assert!(seen.lock().unwrap().is_none());

        assert!(remote.complete_create(RoomId(5)));
        assert_eq!(*seen.lock().unwrap(), Some(RoomId(5)));
        assert!(!remote.complete_create(RoomId(6)));
    }

    #[test]
    fn missing_snapshot_is_unavailable() {
        let mut remote = ScriptedRemote::new();
        assert_eq!(
            remote.receive_snapshot(1),
            Err(SnapshotError::Unavailable { index: 1 })
        );
        assert_eq!(remote.calls.receive_snapshot, 1);
    }
}
