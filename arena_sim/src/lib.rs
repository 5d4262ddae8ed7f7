//! `arena_sim`
//!
//! Implementations of the remote-simulation interface:
//! - `LoopbackSimulation`: an in-process authoritative simulation with a
//!   fixed-timestep step, used by the demo client and end-to-end tests
//! - `ScriptedRemote`: a hand-driven double that records every call
//!
//! Neither does any networking; a real host binds the same trait to its
//! transport.

pub mod loopback;
pub mod scripted;

pub use loopback::{LoopbackConfig, LoopbackSimulation};
pub use scripted::ScriptedRemote;
