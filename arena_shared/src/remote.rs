//! Remote simulation interface.
//!
//! The authoritative simulation lives behind this trait. The client core only
//! polls it and issues requests; any transport, serialization or matchmaking
//! is the implementor's business.
//!
//! Request completions arrive through boxed callbacks, each invoked exactly
//! once. Implementations may call them from inside [`RemoteSimulation::tick`]
//! or directly from the issuing call.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::math::Vec2;

/// Phase codes reported by [`RemoteSimulation::current_phase`].
pub mod phase_code {
    pub const DISCONNECTED: i32 = 0;
    pub const CONNECTED: i32 = 1;
    pub const ROOM_JOINED: i32 = 2;
    pub const WAITING: i32 = 3;
    pub const PLAYING: i32 = 4;
}

/// Identifies a room on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u32);

impl RoomId {
    /// Returned by room creation when it failed.
    pub const INVALID: RoomId = RoomId(0xffff_ffff);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Roster slot of a tracked entity; also the snapshot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u8);

/// Discrete action an entity is performing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Moving,
    /// `phase_time` is the time elapsed since the attack began.
    Attacking { phase_time: f32 },
}

impl Activity {
    pub fn from_code(code: i32, phase_time: f32) -> Option<Self> {
        match code {
            0 => Some(Activity::Idle),
            1 => Some(Activity::Moving),
            2 => Some(Activity::Attacking { phase_time }),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Activity::Idle => 0,
            Activity::Moving => 1,
            Activity::Attacking { .. } => 2,
        }
    }
}

/// One entity sample as pulled from the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub position: Vec2,
    pub direction: Vec2,
    pub state: i32,
    pub phase_time: f32,
}

impl RawSnapshot {
    /// Decodes the activity code; fails on codes this client does not know.
    pub fn activity(&self, index: u8) -> Result<Activity, SnapshotError> {
        Activity::from_code(self.state, self.phase_time).ok_or(SnapshotError::UnknownActivity {
            index,
            code: self.state,
        })
    }
}

/// Snapshot pull failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Nothing to read for this index.
    Unavailable { index: u8 },
    /// The state code is outside the known activities.
    UnknownActivity { index: u8, code: i32 },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Unavailable { index } => {
                write!(f, "snapshot unavailable for entity {index}")
            }
            SnapshotError::UnknownActivity { index, code } => {
                write!(f, "entity {index} reported unknown activity code {code}")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Severity passed to a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Maps the collaborator's numeric severity; unknown values are informational.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => LogLevel::Warning,
            2 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Receives log lines emitted by the remote side.
pub type LogSink = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Completion of a room creation; carries [`RoomId::INVALID`] on failure.
pub type RoomCreatedCallback = Box<dyn FnOnce(RoomId) + Send>;

/// Completion of a join or start request.
pub type RequestCallback = Box<dyn FnOnce(bool) + Send>;

/// Forwards remote log lines into `tracing`.
pub fn tracing_log_sink() -> LogSink {
    Box::new(|level, message| match level {
        LogLevel::Info => info!(target: "remote", "{message}"),
        LogLevel::Warning => warn!(target: "remote", "{message}"),
        LogLevel::Error => error!(target: "remote", "{message}"),
    })
}

/// The authoritative simulation as seen from the client.
pub trait RemoteSimulation {
    /// Starts connecting; `false` means the attempt could not even begin.
    fn initialize(&mut self, host: &str, port: u16, log: LogSink) -> bool;

    /// Current phase code, see [`phase_code`]. Anything else is an error state.
    fn current_phase(&self) -> i32;

    /// Round-trip time in milliseconds. Diagnostic only.
    fn round_trip_time(&self) -> f32;

    /// Room the remote side believes we are in.
    fn room_id(&self) -> RoomId;

    /// Number of players in the current room.
    fn players_count(&self) -> u8;

    /// Pumps the remote side. Called exactly once per frame.
    fn tick(&mut self);

    fn create_room(&mut self, player_count: u8, on_complete: RoomCreatedCallback);

    fn join_room(&mut self, room: RoomId, on_complete: RequestCallback);

    fn start_match(&mut self, on_complete: RequestCallback);

    /// Fire-and-forget local input for this frame.
    fn send_input(&mut self, x: f32, y: f32, attack: bool);

    fn receive_snapshot(&mut self, index: u8) -> Result<RawSnapshot, SnapshotError>;

    /// Position of the arena enemy, if the match has one.
    fn receive_enemy_position(&mut self) -> Option<Vec2>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn shutdown(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_codes_roundtrip_through_snapshot() {
        let snap = RawSnapshot {
            position: Vec2::ZERO,
            direction: Vec2::UP,
            state: 2,
            phase_time: 0.12,
        };
        let activity = snap.activity(0).unwrap();
        assert_eq!(activity, Activity::Attacking { phase_time: 0.12 });
        assert_eq!(activity.code(), 2);
    }

    #[test]
    fn unknown_activity_code_is_an_error() {
        let snap = RawSnapshot {
            position: Vec2::ZERO,
            direction: Vec2::UP,
            state: 9,
            phase_time: 0.0,
        };
        assert_eq!(
            snap.activity(3),
            Err(SnapshotError::UnknownActivity { index: 3, code: 9 })
        );
    }

    #[test]
    fn sentinel_room_is_invalid() {
        assert!(!RoomId::INVALID.is_valid());
        assert!(RoomId(7).is_valid());
    }

    #[test]
    fn log_levels_map_from_codes() {
        assert_eq!(LogLevel::from_code(0), LogLevel::Info);
        assert_eq!(LogLevel::from_code(1), LogLevel::Warning);
        assert_eq!(LogLevel::from_code(2), LogLevel::Error);
        assert_eq!(LogLevel::from_code(42), LogLevel::Info);
    }
}
