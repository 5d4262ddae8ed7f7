//! Motion reconciliation.
//!
//! The remote side sends discrete snapshots at irregular intervals. Positions
//! are authoritative and applied verbatim; velocity and heading are smoothed
//! so snapshot noise does not show up as jitter or instant spins. Both the
//! turn and the change of speed are bounded per second of elapsed time, which
//! keeps the result independent of frame rate.

use std::collections::HashMap;

use arena_shared::{config::ReconcileConfig, math::Vec2, remote::EntityId};
use tracing::{debug, warn};

/// Smoothing state of one tracked entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityMotionState {
    /// Last observed position and the time it was observed; `None` until the first sample.
    pub last_observed: Option<(Vec2, f64)>,
    pub smoothed_velocity: Vec2,
    /// Unit length.
    pub smoothed_heading: Vec2,
}

impl EntityMotionState {
    fn new(default_heading: Vec2) -> Self {
        Self {
            last_observed: None,
            smoothed_velocity: Vec2::ZERO,
            smoothed_heading: default_heading,
        }
    }
}

/// Result of one reconcile call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    pub position: Vec2,
    pub heading: Vec2,
    pub velocity: Vec2,
}

/// Per-entity velocity/heading smoother.
pub struct MotionReconciler {
    cfg: ReconcileConfig,
    default_heading: Vec2,
    entities: HashMap<EntityId, EntityMotionState>,
}

impl MotionReconciler {
    pub fn new(cfg: ReconcileConfig) -> Self {
        let default_heading = match cfg.default_heading.normalize_or_zero() {
            h if h == Vec2::ZERO => Vec2::UP,
            h => h,
        };
        Self {
            cfg,
            default_heading,
            entities: HashMap::new(),
        }
    }

    /// Starts tracking an entity. Existing state is kept.
    pub fn track(&mut self, entity: EntityId) {
        let heading = self.default_heading;
        self.entities
            .entry(entity)
            .or_insert_with(|| EntityMotionState::new(heading));
    }

    /// Discards all state of an entity.
    pub fn forget(&mut self, entity: EntityId) -> Option<EntityMotionState> {
        self.entities.remove(&entity)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn is_tracked(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn state(&self, entity: EntityId) -> Option<&EntityMotionState> {
        self.entities.get(&entity)
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Tracked ids in ascending order.
    pub fn tracked(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Folds one snapshot into the entity's smoothed motion.
    ///
    /// Returns `None` if the entity is not tracked.
    pub fn reconcile(
        &mut self,
        entity: EntityId,
        observed_position: Vec2,
        observed_direction: Option<Vec2>,
        now: f64,
    ) -> Option<Reconciled> {
        let cfg = self.cfg;
        let Some(state) = self.entities.get_mut(&entity) else {
            warn!(entity = ?entity, "Reconcile for untracked entity");
            return None;
        };

        // A zero-length hint carries no direction.
        let hint = observed_direction
            .map(Vec2::normalize_or_zero)
            .filter(|d| *d != Vec2::ZERO);

        let Some((last_position, last_time)) = state.last_observed else {
            if let Some(dir) = hint {
                state.smoothed_heading = dir;
            }
            state.smoothed_velocity = Vec2::ZERO;
            state.last_observed = Some((observed_position, now));
            debug!(entity = ?entity, "Seeded motion state");
            return Some(Reconciled {
                position: observed_position,
                heading: state.smoothed_heading,
                velocity: Vec2::ZERO,
            });
        };

        let dt = (now - last_time) as f32;
        if dt <= 0.0 || !dt.is_finite() {
            return Some(Reconciled {
                position: last_position,
                heading: state.smoothed_heading,
                velocity: state.smoothed_velocity,
            });
        }

        let max_turn = cfg.angular_rate * dt;
        let instant_velocity = (observed_position - last_position) / dt;
        state.smoothed_velocity = state.smoothed_velocity.rotate_towards(
            instant_velocity,
            max_turn,
            cfg.magnitude_rate * dt,
        );

        let target_heading = match hint {
            Some(dir) => Some(dir),
            None if state.smoothed_velocity.len_sq() > cfg.heading_threshold_sq => {
                Some(state.smoothed_velocity.normalize_or_zero())
            }
            None => None,
        };
        if let Some(target) = target_heading {
            let turned = state
                .smoothed_heading
                .rotate_towards(target, max_turn, f32::INFINITY)
                .normalize_or_zero();
            if turned != Vec2::ZERO {
                state.smoothed_heading = turned;
            }
        }

        state.last_observed = Some((observed_position, now));

        Some(Reconciled {
            position: observed_position,
            heading: state.smoothed_heading,
            velocity: state.smoothed_velocity,
        })
    }
}
