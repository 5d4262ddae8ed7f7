//! End to end: the client core plays a match against the loopback simulation.

use std::time::Duration;

use arena_client::driver::TickDriver;
use arena_client::input::InputState;
use arena_client::session::SessionPhase;
use arena_shared::config::ClientConfig;
use arena_shared::remote::EntityId;
use arena_shared::render::Clip;
use arena_sim::{LoopbackConfig, LoopbackSimulation};
use arena_tests::{init_tracing, RecordingSink};

const STEP: f64 = 1.0 / 60.0;

/// Ticks with the given input until `phase` is reached or `limit` frames pass.
fn run_until(
    driver: &mut TickDriver<LoopbackSimulation>,
    now: &mut f64,
    phase: SessionPhase,
    limit: usize,
) -> bool {
    for _ in 0..limit {
        *now += STEP;
        if driver.tick(InputState::default(), *now).phase == phase {
            return true;
        }
    }
    false
}

#[test]
fn full_match_flow_emits_presentation() -> anyhow::Result<()> {
    init_tracing();
    let sink = RecordingSink::new();
    let log = sink.log.clone();

    let sim = LoopbackSimulation::new(LoopbackConfig::default());
    let mut driver = TickDriver::new(sim, ClientConfig::default()).with_sink(Box::new(sink));
    driver.initialize()?;

    let mut now = 0.0;
    assert!(run_until(&mut driver, &mut now, SessionPhase::Connected, 10));

    driver.create_and_join(2)?;
    assert!(run_until(&mut driver, &mut now, SessionPhase::RoomJoined, 10));
    assert!(driver.session().room_id().is_some());

    driver.start_match()?;
    assert!(run_until(&mut driver, &mut now, SessionPhase::Playing, 20));

    // Walk right for a second.
    let mut last = None;
    for _ in 0..60 {
        now += STEP;
        last = Some(driver.tick(InputState::new(1.0, 0.0, false), now));
    }
    let frame = last.expect("ran frames");
    assert_eq!(frame.entities.len(), 2);
    assert!(frame.enemy.is_some());

    let local = frame
        .entities
        .iter()
        .find(|e| e.entity == EntityId(0))
        .expect("local player");
    assert_eq!(local.directive.clip, Clip::Move);
    assert!(local.position.x > 1.0);
    assert!(local.heading.x > 0.9, "heading turned to face the walk");

    let recorded = log.lock().expect("sink lock");
    assert_eq!(recorded.frames, 60);
    assert_eq!(recorded.submitted.len(), 120);
    assert_eq!(recorded.enemy.len(), 60);
    assert!(!recorded.open);
    Ok(())
}

#[test]
fn attack_scrubs_through_the_clip() -> anyhow::Result<()> {
    init_tracing();
    let sim = LoopbackSimulation::new(LoopbackConfig::default());
    let mut cfg = ClientConfig::default();
    cfg.presentation.attack_duration = sim.attack_duration();
    let mut driver = TickDriver::new(sim, cfg);
    driver.initialize()?;

    let mut now = 0.0;
    assert!(run_until(&mut driver, &mut now, SessionPhase::Connected, 10));
    driver.create_and_join(1)?;
    assert!(run_until(&mut driver, &mut now, SessionPhase::RoomJoined, 10));
    driver.start_match()?;
    assert!(run_until(&mut driver, &mut now, SessionPhase::Playing, 20));

    now += STEP;
    driver.tick(InputState::new(0.0, 0.0, true), now);

    let mut scrub = Vec::new();
    for _ in 0..40 {
        now += STEP;
        let frame = driver.tick(InputState::default(), now);
        if let Some(t) = frame.entities[0].directive.normalized_time {
            scrub.push(t);
        }
    }
    assert!(scrub.len() > 10);
    assert!(scrub.windows(2).all(|w| w[0] <= w[1]), "scrub moves forward");
    assert!(scrub.iter().all(|t| (0.0..=1.0).contains(t)));
    Ok(())
}

#[test]
fn dropped_connection_clears_roster_and_session() -> anyhow::Result<()> {
    init_tracing();
    let mut driver = TickDriver::new(
        LoopbackSimulation::new(LoopbackConfig::default()),
        ClientConfig::default(),
    );
    driver.initialize()?;
    let mut now = 0.0;
    assert!(run_until(&mut driver, &mut now, SessionPhase::Connected, 10));
    driver.create_and_join(3)?;
    assert!(run_until(&mut driver, &mut now, SessionPhase::RoomJoined, 10));
    driver.start_match()?;
    assert!(run_until(&mut driver, &mut now, SessionPhase::Playing, 20));
    driver.tick(InputState::default(), now + STEP);
    assert_eq!(driver.reconciler().len(), 3);

    driver.remote_mut().drop_connection();
    let frame = driver.tick(InputState::default(), now + 2.0 * STEP);
    assert_eq!(frame.phase, SessionPhase::Disconnected);
    assert!(driver.reconciler().is_empty());
    assert_eq!(driver.session().room_id(), None);
    Ok(())
}

/// Paced like the demo binary: a tokio interval drives the frames.
#[tokio::test]
async fn paced_loop_reaches_playing() -> anyhow::Result<()> {
    init_tracing();
    let mut driver = TickDriver::new(
        LoopbackSimulation::new(LoopbackConfig::default()),
        ClientConfig::default(),
    );
    driver.initialize()?;

    let mut interval = tokio::time::interval(Duration::from_millis(2));
    let start = tokio::time::Instant::now();
    for _ in 0..200 {
        interval.tick().await;
        let now = start.elapsed().as_secs_f64();
        let frame = driver.tick(InputState::new(0.0, 1.0, false), now);
        match frame.phase {
            SessionPhase::Connected if driver.session().pending_count() == 0 => {
                driver.create_and_join(2)?;
            }
            SessionPhase::RoomJoined if driver.session().pending_count() == 0 => {
                driver.start_match()?;
            }
            SessionPhase::Playing if !frame.entities.is_empty() => break,
            _ => {}
        }
    }
    assert_eq!(driver.phase(), SessionPhase::Playing);

    driver.pause();
    driver.pause();
    assert!(driver.remote().is_paused());
    driver.resume();
    assert!(!driver.remote().is_paused());
    driver.shutdown();
    Ok(())
}
