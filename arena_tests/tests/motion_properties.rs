//! Reconciler bounds over long noisy snapshot streams.

use std::f32::consts::PI;

use arena_client::reconcile::MotionReconciler;
use arena_shared::config::ReconcileConfig;
use arena_shared::math::Vec2;
use arena_shared::remote::EntityId;
use rand::{rngs::StdRng, Rng, SeedableRng};

const TOL: f32 = 1e-4;

struct Sample {
    position: Vec2,
    direction: Option<Vec2>,
    now: f64,
}

/// Irregular timing, jittery positions, occasional teleports and facing hints.
fn noisy_stream(seed: u64, len: usize) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut now = 0.0;
    let mut pos = Vec2::ZERO;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        now += rng.gen_range(0.005..0.2);
        let jump = if rng.gen_bool(0.05) { 20.0 } else { 0.5 };
        pos = pos + Vec2::new(rng.gen_range(-jump..jump), rng.gen_range(-jump..jump));
        let direction = rng
            .gen_bool(0.3)
            .then(|| Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)));
        out.push(Sample {
            position: pos,
            direction,
            now,
        });
    }
    out
}

#[test]
fn heading_turn_and_speed_change_are_bounded() {
    let cfg = ReconcileConfig::default();
    for seed in 0..8 {
        let mut r = MotionReconciler::new(cfg);
        let e = EntityId(0);
        r.track(e);

        let stream = noisy_stream(seed, 400);
        let first = &stream[0];
        let seeded = r
            .reconcile(e, first.position, first.direction, first.now)
            .expect("tracked");
        let mut prev_heading = seeded.heading;
        let mut prev_velocity = seeded.velocity;
        let mut prev_time = first.now;

        for s in &stream[1..] {
            let out = r.reconcile(e, s.position, s.direction, s.now).expect("tracked");
            let dt = (s.now - prev_time) as f32;

            assert_eq!(out.position, s.position, "position is passed through");
            assert!((out.heading.len() - 1.0).abs() < TOL, "heading stays unit");
            assert!(
                prev_heading.angle_between(out.heading) <= cfg.angular_rate * dt + TOL,
                "heading turned too far in {dt}s"
            );
            assert!(
                (out.velocity.len() - prev_velocity.len()).abs()
                    <= cfg.magnitude_rate * dt + TOL,
                "speed changed too much in {dt}s"
            );

            prev_heading = out.heading;
            prev_velocity = out.velocity;
            prev_time = s.now;
        }
    }
}

#[test]
fn heading_holds_while_nearly_stationary() {
    let cfg = ReconcileConfig::default();
    let mut r = MotionReconciler::new(cfg);
    let e = EntityId(1);
    r.track(e);

    let mut rng = StdRng::seed_from_u64(99);
    let mut now = 0.0;
    r.reconcile(e, Vec2::ZERO, None, now);
    let mut prev_heading = r.state(e).expect("tracked").smoothed_heading;

    // Tiny wobble around the origin never builds up enough speed to steer.
    for _ in 0..200 {
        now += 0.016;
        let wobble = Vec2::new(rng.gen_range(-1e-4..1e-4), rng.gen_range(-1e-4..1e-4));
        let out = r.reconcile(e, wobble, None, now).expect("tracked");
        if out.velocity.len_sq() < cfg.heading_threshold_sq {
            assert_eq!(out.heading, prev_heading);
        }
        prev_heading = out.heading;
    }
    assert_eq!(prev_heading, Vec2::UP);
}

#[test]
fn scenario_unit_step_after_tenth_of_a_second() {
    let mut r = MotionReconciler::new(ReconcileConfig::default());
    let e = EntityId(0);
    r.track(e);
    r.reconcile(e, Vec2::ZERO, None, 0.0);
    let out = r.reconcile(e, Vec2::new(1.0, 0.0), None, 0.1).expect("tracked");

    assert!(out.velocity.len() <= 0.6 + TOL);
    assert!(out.velocity.x > 0.0);
    assert!(out.velocity.y.abs() < TOL);
    // The heading turned from forward toward +x, by no more than 0.3π.
    assert!(Vec2::UP.angle_between(out.heading) <= 3.0 * PI * 0.1 + TOL);
    assert!(out.heading.x > 0.0);
}

#[test]
fn entities_do_not_share_state() {
    let mut r = MotionReconciler::new(ReconcileConfig::default());
    let (a, b) = (EntityId(0), EntityId(1));
    r.track(a);
    r.track(b);

    r.reconcile(a, Vec2::ZERO, None, 0.0);
    r.reconcile(b, Vec2::ZERO, None, 0.0);
    r.reconcile(a, Vec2::new(5.0, 0.0), None, 0.5);

    assert_eq!(r.state(b).expect("tracked").smoothed_velocity, Vec2::ZERO);
    assert!(r.state(a).expect("tracked").smoothed_velocity.len() > 0.0);
}
