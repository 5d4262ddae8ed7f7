//! Discrete activity to animation playback mapping.

use arena_shared::{
    config::PresentationConfig,
    remote::Activity,
    render::{Clip, PlaybackDirective, PlaybackMode},
};

/// Stateless mapper from activity and smoothed speed to a playback directive.
#[derive(Debug, Clone, Copy)]
pub struct PresentationMapper {
    cfg: PresentationConfig,
}

impl PresentationMapper {
    pub fn new(cfg: PresentationConfig) -> Self {
        Self { cfg }
    }

    pub fn map(&self, activity: &Activity, speed: f32) -> PlaybackDirective {
        match *activity {
            Activity::Idle => PlaybackDirective {
                clip: Clip::Idle,
                mode: PlaybackMode::Loop,
                blend_time: self.cfg.blend_time,
                speed: 1.0,
                normalized_time: None,
                interrupt: false,
            },
            Activity::Moving => PlaybackDirective {
                clip: Clip::Move,
                mode: PlaybackMode::Loop,
                blend_time: self.cfg.blend_time,
                speed: speed * self.cfg.move_speed_scale,
                normalized_time: None,
                interrupt: false,
            },
            // Scrubbed by the remote phase time rather than played.
            Activity::Attacking { phase_time } => {
                let position = if self.cfg.attack_duration > 0.0 {
                    (phase_time / self.cfg.attack_duration).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                PlaybackDirective {
                    clip: Clip::Attack,
                    mode: PlaybackMode::Once,
                    blend_time: 0.0,
                    speed: 0.0,
                    normalized_time: Some(position),
                    interrupt: true,
                }
            }
        }
    }
}

impl Default for PresentationMapper {
    fn default() -> Self {
        Self::new(PresentationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_loops_with_default_blend() {
        let d = PresentationMapper::default().map(&Activity::Idle, 3.0);
        assert_eq!(d.clip, Clip::Idle);
        assert_eq!(d.mode, PlaybackMode::Loop);
        assert_eq!(d.blend_time, 0.25);
        assert!(!d.interrupt);
    }

    #[test]
    fn moving_speed_scales_with_velocity() {
        let d = PresentationMapper::default().map(&Activity::Moving, 8.0);
        assert_eq!(d.clip, Clip::Move);
        assert_eq!(d.speed, 2.0);
        assert_eq!(d.normalized_time, None);
    }

    #[test]
    fn attack_is_scrubbed_to_phase_time() {
        let d = PresentationMapper::default().map(&Activity::Attacking { phase_time: 0.12 }, 5.0);
        assert_eq!(d.clip, Clip::Attack);
        assert_eq!(d.mode, PlaybackMode::Once);
        assert_eq!(d.speed, 0.0);
        assert!(d.interrupt);
        assert!((d.normalized_time.unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn attack_past_its_end_clamps() {
        let d = PresentationMapper::default().map(&Activity::Attacking { phase_time: 1.0 }, 0.0);
        assert_eq!(d.normalized_time, Some(1.0));
    }
}
