//! Helpers shared by the integration tests.

use std::sync::{Arc, Mutex};

use arena_shared::{
    math::Vec2,
    remote::EntityId,
    render::{PlaybackDirective, PresentationSink},
};

/// Installs a test-friendly subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// One submission seen by a [`RecordingSink`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submitted {
    pub entity: EntityId,
    pub position: Vec2,
    pub heading: Vec2,
    pub directive: PlaybackDirective,
}

/// What a [`RecordingSink`] has seen so far.
#[derive(Debug, Default)]
pub struct Recording {
    pub frames: u32,
    pub open: bool,
    pub submitted: Vec<Submitted>,
    pub enemy: Vec<Vec2>,
}

/// Presentation sink that records into shared state the test keeps a handle to.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub log: Arc<Mutex<Recording>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresentationSink for RecordingSink {
    fn begin_frame(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            assert!(!log.open, "begin_frame while a frame is open");
            log.open = true;
        }
    }

    fn submit(
        &mut self,
        entity: EntityId,
        position: Vec2,
        heading: Vec2,
        directive: PlaybackDirective,
    ) {
        if let Ok(mut log) = self.log.lock() {
            assert!(log.open, "submit outside a frame");
            log.submitted.push(Submitted {
                entity,
                position,
                heading,
                directive,
            });
        }
    }

    fn submit_enemy(&mut self, position: Vec2) {
        if let Ok(mut log) = self.log.lock() {
            log.enemy.push(position);
        }
    }

    fn end_frame(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.open = false;
            log.frames += 1;
        }
    }
}
