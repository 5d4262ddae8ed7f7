//! `arena_client`
//!
//! Client-side core between the remote simulation and the presentation layer:
//! - Session state machine with asynchronous request completion
//! - Motion reconciliation (bounded heading/velocity smoothing per entity)
//! - Activity to animation playback mapping
//! - Per-frame tick driver tying the three together

pub mod driver;
pub mod input;
pub mod presentation;
pub mod reconcile;
pub mod session;

pub use driver::{Frame, TickDriver};
pub use session::{SessionController, SessionError, SessionPhase};
