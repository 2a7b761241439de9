mod run;

pub use crate::run::{spawn_simulation, Shared, Snapshot, Stats, STEP_INTERVAL};

use anyhow::anyhow;
use clap::Parser;
use instant::Instant;
use physics::{scenario, Config, Simulation, DELTA_TIME, EPSILON, LEAF_CAPACITY, THETA};
use std::{thread, time::Duration};

/// Headless Barnes-Hut simulation of a rotating disc of bodies.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Number of bodies in the disc, including the central mass.
    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub bodies: usize,
    /// Wall-clock seconds to run for.
    #[arg(short, long, default_value_t = 10.0)]
    pub seconds: f64,
    #[arg(long, default_value_t = DELTA_TIME)]
    pub dt: f32,
    #[arg(long, default_value_t = THETA)]
    pub theta: f32,
    #[arg(long, default_value_t = EPSILON)]
    pub eps: f32,
    #[arg(long, default_value_t = LEAF_CAPACITY)]
    pub leaf_cap: usize,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Rate at which snapshots are taken from the simulation thread.
    #[arg(long, default_value_t = 31.25)]
    pub fps: f64,
    /// Pause between two simulation steps, in milliseconds.
    #[arg(long, default_value_t = STEP_INTERVAL.as_millis() as u64)]
    pub step_interval_ms: u64,
}

impl Args {
    pub fn config(&self) -> Config {
        Config {
            dt: self.dt,
            theta: self.theta,
            eps: self.eps,
            leaf_cap: self.leaf_cap,
        }
    }
}

pub fn start() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run(Args::parse())
}

pub fn run(args: Args) -> anyhow::Result<()> {
    if args.fps.is_nan() || args.fps <= 0.0 {
        return Err(anyhow!("--fps must be positive, got {}", args.fps));
    }
    log::info!("Setting up {} bodies with seed {}", args.bodies, args.seed);
    let bodies = scenario::uniform_disc(args.bodies, args.seed)?;
    let sim = Simulation::new(args.config(), bodies)?;

    let shared = Shared::new();
    let handle = spawn_simulation(
        sim,
        shared.clone(),
        Duration::from_millis(args.step_interval_ms),
    )?;

    let frame_time = Duration::from_secs_f64(1.0 / args.fps);
    let deadline = Instant::now() + Duration::from_secs_f64(args.seconds.max(0.0));
    let mut snapshot = Snapshot::default();
    let mut frames: u64 = 0;
    let mut received: u64 = 0;
    log::info!("Starting frame loop");
    while Instant::now() < deadline && !handle.is_finished() {
        let frame_start = Instant::now();
        frames += 1;
        if shared.take_snapshot(&mut snapshot) {
            received += 1;
            if received.is_power_of_two() || received % 1024 == 0 {
                log::info!("{}", frame_summary(frames, &snapshot));
            }
        }
        let elapsed = Instant::now().duration_since(frame_start);
        if let Some(rest) = frame_time.checked_sub(elapsed) {
            thread::sleep(rest);
        }
    }

    shared.stop();
    let stats = handle
        .join()
        .map_err(|_| anyhow!("simulation thread panicked"))??;
    log::info!(
        "Done: {} frames ({} with a new step), {} steps averaging {:.3}ms",
        frames,
        received,
        stats.steps,
        stats.time_spent_stepping.as_secs_f64() * 1e3 / stats.steps.max(1) as f64,
    );
    Ok(())
}

fn frame_summary(frames: u64, snapshot: &Snapshot) -> String {
    format!(
        "Frame {}: step {}, {} bodies, {} nodes ({} branches), {} collisions, {} bytes of bodies",
        frames,
        snapshot.frame,
        snapshot.bodies.len(),
        snapshot.nodes.len(),
        snapshot.parents,
        snapshot.collisions,
        snapshot.bodies_bytes().len(),
    )
}
