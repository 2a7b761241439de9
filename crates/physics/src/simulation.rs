use crate::{Body, Config, QuadNode, QuadTree, Result};
use cgmath::{prelude::*, Vector2};
use rayon::prelude::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

/// Fraction of the approach speed kept after a contact; the impulse along the
/// contact normal is scaled by `1 + RESTITUTION`.
const RESTITUTION: f32 = 0.5;
/// Squared separation below which two bodies count as coincident.
const COINCIDENT_SQ: f32 = 1e-12;

/// Axis-aligned bounds of a body, refreshed every `collide`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}
impl Rect {
    pub fn around(body: &Body) -> Rect {
        let extent = Vector2::new(body.radius, body.radius);
        Rect {
            min: body.pos - extent,
            max: body.pos + extent,
        }
    }
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

pub struct Simulation {
    config: Config,
    frame: u64,
    bodies: Vec<Body>,
    rects: Vec<Rect>,
    accels: Vec<Vector2<f32>>,
    quadtree: QuadTree,
    collisions: usize,
}

impl Simulation {
    pub fn new(config: Config, bodies: Vec<Body>) -> Result<Self> {
        let quadtree = QuadTree::from_config(&config, bodies.len())?;
        let mut sim = Self {
            config,
            frame: 0,
            bodies,
            rects: Vec::new(),
            accels: Vec::new(),
            quadtree,
            collisions: 0,
        };
        sim.reserve_scratch()?;
        log::info!(
            "Created simulation of {} bodies (dt {}, theta {}, eps {}, leaf capacity {})",
            sim.bodies.len(),
            config.dt,
            config.theta,
            config.eps,
            config.leaf_cap
        );
        Ok(sim)
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn frame(&self) -> u64 {
        self.frame
    }
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }
    /// Flattened tree of the last `attract`, for renderers.
    pub fn nodes(&self) -> &[QuadNode] {
        self.quadtree.nodes()
    }
    pub fn quadtree(&self) -> &QuadTree {
        &self.quadtree
    }
    /// Pairs resolved by the last `collide`.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
    pub fn momentum(&self) -> Vector2<f32> {
        self.bodies.iter().map(|b| b.vel * b.mass).sum()
    }

    pub fn add_body(&mut self, body: Body) -> Result<()> {
        self.add_bodies(std::slice::from_ref(&body))
    }
    pub fn add_bodies(&mut self, bodies: &[Body]) -> Result<()> {
        self.bodies.try_reserve(bodies.len())?;
        self.bodies.extend_from_slice(bodies);
        self.reserve_scratch()
    }
    fn reserve_scratch(&mut self) -> Result<()> {
        let n = self.bodies.len();
        self.rects.try_reserve(n.saturating_sub(self.rects.len()))?;
        self.accels.try_reserve(n.saturating_sub(self.accels.len()))?;
        Ok(())
    }

    pub fn step(&mut self) -> Result<()> {
        self.integrate();
        self.attract()?;
        self.collide();
        self.frame += 1;
        Ok(())
    }

    pub fn integrate(&mut self) {
        let dt = self.config.dt;
        for body in &mut self.bodies {
            body.update(dt);
        }
    }

    /// Rebuilds the tree (reordering the bodies) and sets every body's
    /// acceleration from it.
    pub fn attract(&mut self) -> Result<()> {
        self.quadtree.build(&mut self.bodies)?;

        let tree = &self.quadtree;
        let bodies = &self.bodies;
        bodies
            .par_iter()
            .map(|body| tree.accelerate(body.pos, bodies))
            .collect_into_vec(&mut self.accels);

        for (body, acc) in self.bodies.iter_mut().zip(&self.accels) {
            body.acc = *acc;
        }
        Ok(())
    }

    /// Exhaustive pairwise collision pass.
    pub fn collide(&mut self) {
        self.collisions = 0;
        self.rects.clear();
        self.rects.extend(self.bodies.iter().map(Rect::around));

        for lhs in 0..self.bodies.len() {
            for rhs in lhs + 1..self.bodies.len() {
                if self.rects[lhs].overlaps(&self.rects[rhs]) && self.resolve(lhs, rhs) {
                    self.rects[lhs] = Rect::around(&self.bodies[lhs]);
                    self.rects[rhs] = Rect::around(&self.bodies[rhs]);
                    self.collisions += 1;
                }
            }
        }
    }

    /// Resolves an overlap between bodies `lhs` and `rhs`. Returns whether they
    /// were overlapping.
    pub fn resolve(&mut self, lhs: usize, rhs: usize) -> bool {
        if lhs == rhs {
            return false;
        }
        let mut b1 = self.bodies[lhs];
        let mut b2 = self.bodies[rhs];

        let d = b2.pos - b1.pos;
        let r = b1.radius + b2.radius;
        let d_sq = d.magnitude2();
        if d_sq > r * r {
            return false;
        }

        let v = b2.vel - b1.vel;
        let d_dot_v = d.dot(v);
        let v_sq = v.magnitude2();
        let total_mass = b1.mass + b2.mass;
        let (weight1, weight2) = if total_mass > 0.0 {
            (b2.mass / total_mass, b1.mass / total_mass)
        } else {
            (0.5, 0.5)
        };

        if d_sq <= COINCIDENT_SQ && v_sq == 0.0 {
            // No direction to work with; separate along x.
            let tmp = Vector2::new(r, 0.0);
            b1.pos -= tmp * weight1;
            b2.pos += tmp * weight2;
        } else if d_dot_v >= 0.0 && d_sq > COINCIDENT_SQ {
            // Separating or resting: only undo the overlap.
            let tmp = d * (r / d_sq.sqrt() - 1.0);
            b1.pos -= tmp * weight1;
            b2.pos += tmp * weight2;
        } else {
            // Approaching: rewind to the moment of contact, exchange the
            // impulse there, then replay the rest of the frame.
            let t = (d_dot_v + (d_dot_v * d_dot_v - v_sq * (d_sq - r * r)).max(0.0).sqrt()) / v_sq;
            b1.pos -= b1.vel * t;
            b2.pos -= b2.vel * t;

            let d = b2.pos - b1.pos;
            let d_sq = d.magnitude2();
            if d_sq > 0.0 {
                let tmp = d * ((1.0 + RESTITUTION) * d.dot(v) / d_sq);
                b1.vel += tmp * weight1;
                b2.vel -= tmp * weight2;
            }

            b1.pos += b1.vel * t;
            b2.pos += b2.vel * t;
        }

        self.bodies[lhs] = b1;
        self.bodies[rhs] = b2;
        true
    }
}
