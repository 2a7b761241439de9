//! Initial conditions.

use crate::{Body, Result};
use cgmath::{prelude::*, Vector2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Uniform;
use std::f32::consts::TAU;

const BLACK_HOLE_MASS: f32 = 1e6;
const INNER_RADIUS: f32 = 25.0;

/// A heavy body at the origin surrounded by `n - 1` unit bodies spread
/// uniformly over an annulus, each moving on a circular orbit around the mass
/// enclosed by its radius.
pub fn uniform_disc(n: usize, seed: u64) -> Result<Vec<Body>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let angle = Uniform::new(0.0, TAU);

    let mut bodies = Vec::new();
    bodies.try_reserve_exact(n)?;
    if n == 0 {
        return Ok(bodies);
    }

    let outer_radius = (n as f32).sqrt() * 5.0;
    bodies.push(Body::new(
        Vector2::zero(),
        Vector2::zero(),
        BLACK_HOLE_MASS,
        INNER_RADIUS,
    ));

    let t = INNER_RADIUS / outer_radius;
    while bodies.len() < n {
        let (sin, cos) = rng.sample(angle).sin_cos();
        let r = rng.gen::<f32>() * (1.0 - t * t) + t * t;

        let pos = Vector2::new(cos, sin) * outer_radius * r.sqrt();
        let vel = Vector2::new(sin, -cos);
        let mass = 1.0f32;
        bodies.push(Body::new(pos, vel, mass, mass.cbrt()));
    }

    bodies.sort_by(|a, b| a.pos.magnitude2().total_cmp(&b.pos.magnitude2()));

    let mut enclosed = 0.0f32;
    for body in &mut bodies {
        enclosed += body.mass;
        if body.pos == Vector2::zero() {
            continue;
        }
        let dist = body.pos.magnitude();
        body.vel *= (enclosed / dist).sqrt();
    }

    Ok(bodies)
}
