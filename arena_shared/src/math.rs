//! Math types.
//!
//! This module intentionally stays small and deterministic.
//! Everything lives on the ground plane, so a 2D vector is all we need.

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Lengths below this are treated as zero when normalizing.
pub const EPSILON: f32 = 1e-6;

/// 2D vector on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    /// Forward on the ground plane.
    pub const UP: Self = Self { x: 0.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// Z component of the 3D cross product; positive when `rhs` is counter-clockwise.
    pub fn perp_dot(self, rhs: Self) -> f32 {
        self.x * rhs.y - self.y * rhs.x
    }

    pub fn len_sq(self) -> f32 {
        self.dot(self)
    }

    pub fn len(self) -> f32 {
        self.len_sq().sqrt()
    }

    /// Unit vector in the same direction, or zero when the length is below
    /// [`EPSILON`] or not finite.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.len();
        if len < EPSILON || !len.is_finite() {
            Self::ZERO
        } else {
            self / len
        }
    }

    /// Rotates counter-clockwise by `radians`.
    pub fn rotate(self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Unsigned angle between two vectors in `[0, π]`; zero if either is degenerate.
    pub fn angle_between(self, other: Self) -> f32 {
        if self.len_sq() < EPSILON * EPSILON || other.len_sq() < EPSILON * EPSILON {
            return 0.0;
        }
        self.perp_dot(other).atan2(self.dot(other)).abs()
    }

    /// Moves toward `target` by at most `max_delta` along the straight line.
    pub fn move_towards(self, target: Self, max_delta: f32) -> Self {
        let delta = target - self;
        let dist = delta.len();
        if dist <= max_delta || dist < EPSILON {
            target
        } else {
            self + delta * (max_delta / dist)
        }
    }

    /// Turns `self` toward `target`.
    ///
    /// The direction rotates by at most `max_radians` and the length changes by
    /// at most `max_magnitude_delta`. When either vector is degenerate there is
    /// no direction to rotate, so this falls back to [`Vec2::move_towards`].
    /// A non-finite target leaves `self` unchanged.
    pub fn rotate_towards(self, target: Self, max_radians: f32, max_magnitude_delta: f32) -> Self {
        let cur_len = self.len();
        let target_len = target.len();
        if !target_len.is_finite() {
            return self;
        }
        if cur_len < EPSILON || target_len < EPSILON {
            return self.move_towards(target, max_magnitude_delta);
        }

        let from = self / cur_len;
        let to = target / target_len;
        let signed = from.perp_dot(to).atan2(from.dot(to));
        let step = signed.clamp(-max_radians.max(0.0), max_radians.max(0.0));
        // Snap exactly onto the target direction when within reach.
        let dir = if step == signed { to } else { from.rotate(step) };

        let len = move_scalar_towards(cur_len, target_len, max_magnitude_delta);
        dir * len
    }
}

fn move_scalar_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}
