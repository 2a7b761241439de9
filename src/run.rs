//! Simulation thread and the snapshot handoff to whoever renders.
//!
//! The simulation thread owns the [`Simulation`]. After every step it locks
//! the published [`Snapshot`], copies its bodies and tree nodes in, marks it
//! ready and unlocks, without waiting for the copy to be consumed. A reader
//! copies the snapshot out under the same lock, so it sees either a whole step
//! or nothing new.

use instant::Instant;
use physics::{Body, QuadNode, Simulation};
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

pub const STEP_INTERVAL: Duration = Duration::from_millis(1);
const PAUSED_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub bodies: Vec<Body>,
    pub nodes: Vec<QuadNode>,
    pub frame: u64,
    pub parents: usize,
    pub collisions: usize,
}

impl Snapshot {
    fn capture(&mut self, sim: &Simulation) {
        self.bodies.clear();
        self.bodies.extend_from_slice(sim.bodies());
        self.nodes.clear();
        self.nodes.extend_from_slice(sim.nodes());
        self.frame = sim.frame();
        self.parents = sim.quadtree().parents().len();
        self.collisions = sim.collisions();
    }
    fn copy_from(&mut self, other: &Snapshot) {
        self.bodies.clear();
        self.bodies.extend_from_slice(&other.bodies);
        self.nodes.clear();
        self.nodes.extend_from_slice(&other.nodes);
        self.frame = other.frame;
        self.parents = other.parents;
        self.collisions = other.collisions;
    }
    /// Raw body data, laid out for upload to a vertex buffer.
    pub fn bodies_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.bodies)
    }
    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }
}

#[derive(Default)]
struct Published {
    snapshot: Snapshot,
    ready: bool,
}

/// State shared between the simulation thread and its readers.
#[derive(Default)]
pub struct Shared {
    published: Mutex<Published>,
    spawned: Mutex<Vec<Body>>,
    paused: AtomicBool,
    stopped: AtomicBool,
}

impl Shared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Relaxed)
    }
    /// Ends the simulation loop after its current step.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::Relaxed)
    }
    /// Queues a body to be added before the next step.
    pub fn spawn(&self, body: Body) {
        lock(&self.spawned).push(body);
    }
    /// Copies the latest step into `out` if one was published since the last
    /// call.
    pub fn take_snapshot(&self, out: &mut Snapshot) -> bool {
        let mut published = lock(&self.published);
        if !published.ready {
            return false;
        }
        out.copy_from(&published.snapshot);
        published.ready = false;
        true
    }
    fn publish(&self, sim: &Simulation) {
        let mut published = lock(&self.published);
        published.snapshot.capture(sim);
        published.ready = true;
    }
    fn drain_spawned(&self, into: &mut Vec<Body>) {
        into.append(&mut lock(&self.spawned));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub steps: u64,
    pub time_spent_stepping: Duration,
}

/// Runs `sim` on its own thread until [`Shared::stop`] is called, sleeping
/// `interval` between steps.
pub fn spawn_simulation(
    mut sim: Simulation,
    shared: Arc<Shared>,
    interval: Duration,
) -> io::Result<JoinHandle<physics::Result<Stats>>> {
    thread::Builder::new()
        .name("simulation".into())
        .spawn(move || {
            let mut stats = Stats::default();
            let mut spawned = Vec::new();
            log::info!("Simulation loop started");
            while shared.is_running() {
                if shared.is_paused() {
                    thread::sleep(PAUSED_INTERVAL);
                    continue;
                }

                shared.drain_spawned(&mut spawned);
                if !spawned.is_empty() {
                    sim.add_bodies(&spawned).map_err(|err| {
                        log::error!("Adding {} spawned bodies failed: {}", spawned.len(), err);
                        err
                    })?;
                    log::debug!("Spawned {} bodies", spawned.len());
                    spawned.clear();
                }

                let before = Instant::now();
                sim.step().map_err(|err| {
                    log::error!("Simulation step {} failed: {}", sim.frame(), err);
                    err
                })?;
                stats.time_spent_stepping += Instant::now().duration_since(before);
                stats.steps += 1;

                shared.publish(&sim);

                if stats.steps.is_power_of_two() || stats.steps % 1024 == 0 {
                    log::info!(
                        "{} steps in {:.3}s, {} bodies, {} nodes, {} collisions",
                        stats.steps,
                        stats.time_spent_stepping.as_secs_f64(),
                        sim.bodies().len(),
                        sim.nodes().len(),
                        sim.collisions(),
                    );
                }
                thread::sleep(interval);
            }
            log::info!("Simulation loop stopped after {} steps", stats.steps);
            Ok(stats)
        })
}
