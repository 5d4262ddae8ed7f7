//! `arena_shared`
//!
//! Types shared by the client core and the remote-simulation collaborators.
//!
//! Design goals:
//! - Deterministic and small (math, config).
//! - The remote simulation and the presentation layer are traits, so the core
//!   can be driven headless in tests.
//! - No `unsafe`.

pub mod config;
pub mod math;
pub mod remote;
pub mod render;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::math::*;
    pub use crate::remote::*;
    pub use crate::render::*;
}
