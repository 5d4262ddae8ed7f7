//! Presentation boundary.
//!
//! This crate intentionally does not depend on a rendering or animation
//! backend. A host binds these traits to its engine.

use serde::{Deserialize, Serialize};

use crate::{math::Vec2, remote::EntityId};

/// Animation clip to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clip {
    Idle,
    Move,
    Attack,
}

/// How a clip advances once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    Loop,
    Once,
}

/// Resolved animation instruction for one entity on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackDirective {
    pub clip: Clip,
    pub mode: PlaybackMode,
    /// Crossfade time in seconds.
    pub blend_time: f32,
    pub speed: f32,
    /// Scrub position in `[0, 1]`; `None` lets the clip run freely.
    pub normalized_time: Option<f32>,
    /// Cut whatever is playing instead of blending.
    pub interrupt: bool,
}

/// Receives the per-entity output of a frame.
pub trait PresentationSink {
    fn begin_frame(&mut self);
    fn submit(
        &mut self,
        entity: EntityId,
        position: Vec2,
        heading: Vec2,
        directive: PlaybackDirective,
    );
    fn submit_enemy(&mut self, position: Vec2);
    fn end_frame(&mut self);
}

/// A no-op sink useful for headless runs.
#[derive(Default)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn begin_frame(&mut self) {}
    fn submit(
        &mut self,
        _entity: EntityId,
        _position: Vec2,
        _heading: Vec2,
        _directive: PlaybackDirective,
    ) {
    }
    fn submit_enemy(&mut self, _position: Vec2) {}
    fn end_frame(&mut self) {}
}
