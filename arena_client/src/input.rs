//! Input handling.
//!
//! In a real client this would integrate with windowing and action bindings.
//! Here it only defines the per-frame sample forwarded to the remote side.

/// User input sampled for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    /// Horizontal axis in `[-1, 1]`.
    pub x: f32,
    /// Vertical axis in `[-1, 1]`.
    pub y: f32,
    pub attack: bool,
}

impl InputState {
    pub fn new(x: f32, y: f32, attack: bool) -> Self {
        Self { x, y, attack }
    }

    /// Axes clamped to `[-1, 1]`; non-finite values become zero.
    pub fn sanitized(self) -> Self {
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            x: axis(self.x),
            y: axis(self.y),
            attack: self.attack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_and_drops_nan() {
        let s = InputState::new(3.0, f32::NAN, true).sanitized();
        assert_eq!(s, InputState::new(1.0, 0.0, true));
    }
}
