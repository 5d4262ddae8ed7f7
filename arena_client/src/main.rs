//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p arena_client -- [--host localhost] [--port 1234] [--players 2]
//!                                [--config client.json] [--frames 600]
//!
//! Runs the client core against the in-process loopback simulation: connects,
//! creates and joins a room, starts the match and plays it with scripted
//! input, logging what the presentation layer would receive.

use std::env;
use std::time::{Duration, Instant};

use anyhow::Context;
use arena_client::driver::TickDriver;
use arena_client::input::InputState;
use arena_client::session::{SessionEvent, SessionPhase};
use arena_shared::config::ClientConfig;
use arena_sim::{LoopbackConfig, LoopbackSimulation};
use tracing::{info, warn};

struct Args {
    cfg: ClientConfig,
    frames: u64,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().collect();

    // The config file is the base; flags override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => ClientConfig::load(&args[i + 1])?,
        _ => ClientConfig::default(),
    };
    let mut frames = 600;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" if i + 1 < args.len() => {
                cfg.server_host = args[i + 1].clone();
                i += 2;
            }
            "--port" if i + 1 < args.len() => {
                cfg.server_port = args[i + 1].parse().context("parse --port")?;
                i += 2;
            }
            "--players" if i + 1 < args.len() => {
                cfg.player_count = args[i + 1].parse().context("parse --players")?;
                i += 2;
            }
            "--frames" if i + 1 < args.len() => {
                frames = args[i + 1].parse().context("parse --frames")?;
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(Args { cfg, frames })
}

/// Walks in a slow circle and attacks every few seconds.
fn scripted_input(t: f64) -> InputState {
    let angle = (t * 0.5) as f32;
    let attack = (t % 4.0) < 0.05;
    InputState::new(angle.cos(), angle.sin(), attack)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let Args { mut cfg, frames } = parse_args()?;
    info!(host = %cfg.server_host, port = cfg.server_port, players = cfg.player_count, "Starting client");

    let sim = LoopbackSimulation::new(LoopbackConfig::default());
    cfg.presentation.attack_duration = sim.attack_duration();

    let tick_interval = Duration::from_secs_f32(1.0 / cfg.tick_hz.max(1) as f32);
    let player_count = cfg.player_count;
    let mut driver = TickDriver::new(sim, cfg);
    driver.initialize().context("initialize remote simulation")?;

    let start = Instant::now();
    let mut interval = tokio::time::interval(tick_interval);

    for _ in 0..frames {
        interval.tick().await;
        let now = start.elapsed().as_secs_f64();
        let frame = driver.tick(scripted_input(now), now);

        for event in &frame.events {
            match event {
                SessionEvent::PhaseChanged { to, .. } => info!(phase = ?to, "Phase"),
                SessionEvent::RoomJoined(room) => info!(room = %room, "Joined room"),
                SessionEvent::RequestFailed(error) => warn!(error = %error, "Request failed"),
                SessionEvent::Stale(kind) => warn!(?kind, "Stale completion"),
            }
        }

        // Drive the lobby flow forward the way a menu would.
        let request = match frame.phase {
            SessionPhase::Connected if driver.session().pending_count() == 0 => {
                Some(driver.create_and_join(player_count))
            }
            SessionPhase::RoomJoined if driver.session().pending_count() == 0 => {
                Some(driver.start_match())
            }
            _ => None,
        };
        if let Some(Err(error)) = request {
            warn!(error = %error, "Request rejected");
        }

        if frame.index % 60 == 0 {
            if let Some(local) = frame.entities.first() {
                info!(
                    frame = frame.index,
                    x = local.position.x,
                    y = local.position.y,
                    clip = ?local.directive.clip,
                    "Local player"
                );
            }
        }
    }

    for line in driver.status() {
        println!("{}", line);
    }
    driver.shutdown();

    Ok(())
}
