use cgmath::{prelude::*, Vector2};
use physics::{scenario, Body, Config, Simulation};

/// Two unit bodies at rest on the x axis, `dist` apart, heading at each other
/// with speed `speed` each.
fn head_on(dist: f32, speed: f32) -> Vec<Body> {
    vec![
        Body::new(Vector2::new(-dist / 2.0, 0.0), Vector2::new(speed, 0.0), 1.0, 1.0),
        Body::new(Vector2::new(dist / 2.0, 0.0), Vector2::new(-speed, 0.0), 1.0, 1.0),
    ]
}

/// Softening large enough that the gravity between unit masses is negligible.
fn no_gravity() -> Config {
    Config {
        eps: 1e3,
        ..Config::default()
    }
}

fn leftmost(sim: &Simulation) -> Body {
    *sim.bodies()
        .iter()
        .min_by(|a, b| a.pos.x.total_cmp(&b.pos.x))
        .unwrap()
}

fn rightmost(sim: &Simulation) -> Body {
    *sim.bodies()
        .iter()
        .max_by(|a, b| a.pos.x.total_cmp(&b.pos.x))
        .unwrap()
}

// ==================================================================================
// Collisions
// ==================================================================================

#[test]
fn head_on_collision_reverses_both_bodies() {
    let mut sim = Simulation::new(no_gravity(), head_on(4.0, 1.0)).unwrap();
    let mut steps = 0;
    while leftmost(&sim).vel.x > 0.0 {
        sim.step().unwrap();
        steps += 1;
        assert!(steps < 200, "bodies never collided");
    }
    let (left, right) = (leftmost(&sim), rightmost(&sim));
    assert!(left.vel.x < 0.0 && right.vel.x > 0.0);
    assert!((left.vel.x + right.vel.x).abs() < 1e-3, "{:?} {:?}", left.vel, right.vel);
    assert!(left.vel.y.abs() < 1e-4 && right.vel.y.abs() < 1e-4);
    assert!((right.pos - left.pos).magnitude() >= 2.0 - 1e-3);

    // They keep moving apart afterwards.
    let gap = (right.pos - left.pos).magnitude();
    sim.step().unwrap();
    assert!((rightmost(&sim).pos - leftmost(&sim).pos).magnitude() > gap);
}

#[test]
fn collisions_conserve_momentum() {
    let mut bodies = head_on(3.0, 2.0);
    bodies[1].mass = 3.0;
    bodies[1].pos.y = 0.5;
    let mut sim = Simulation::new(no_gravity(), bodies).unwrap();
    let before = sim.momentum();
    for _ in 0..40 {
        sim.step().unwrap();
    }
    assert!((sim.momentum() - before).magnitude() < 1e-2);
}

#[test]
fn overlapping_pairs_leave_resolve_separated() {
    let cases = [
        head_on(1.0, 1.0),
        head_on(1.0, -1.0),
        head_on(0.2, 0.0),
        head_on(1.9, 3.0),
    ];
    for bodies in cases {
        let mut sim = Simulation::new(no_gravity(), bodies).unwrap();
        assert!(sim.resolve(0, 1));
        let d = sim.bodies()[1].pos - sim.bodies()[0].pos;
        assert!(d.magnitude() >= 2.0 - 1e-4, "still overlapping: {:?}", d);
    }
}

// ==================================================================================
// Gravity
// ==================================================================================

#[test]
fn circular_orbit_acceleration_points_to_center() {
    let mass = 1e4f32;
    let radius = 100.0f32;
    let speed = (mass / radius).sqrt();
    for leaf_cap in [1, 16] {
        let config = Config {
            theta: 0.0,
            eps: 1e-3,
            leaf_cap,
            ..Config::default()
        };
        let bodies = vec![
            Body::new(Vector2::zero(), Vector2::zero(), mass, 1.0),
            Body::new(Vector2::new(radius, 0.0), Vector2::new(0.0, speed), 1.0, 1.0),
        ];
        let mut sim = Simulation::new(config, bodies).unwrap();
        sim.attract().unwrap();

        let light = sim.bodies().iter().find(|b| b.mass == 1.0).unwrap();
        let expected = mass / (radius * radius);
        assert!((light.acc.magnitude() - expected).abs() < 1e-3 * expected);
        let toward_center = -light.pos.normalize();
        assert!(light.acc.normalize().dot(toward_center) > 0.9999);
    }
}

#[test]
fn orbit_stays_near_its_radius() {
    let mass = 1e4f32;
    let radius = 100.0f32;
    let config = Config {
        dt: 0.01,
        theta: 0.0,
        eps: 1e-3,
        leaf_cap: 1,
    };
    let bodies = vec![
        Body::new(Vector2::zero(), Vector2::zero(), mass, 1.0),
        Body::new(Vector2::new(radius, 0.0), Vector2::new(0.0, (mass / radius).sqrt()), 1.0, 1.0),
    ];
    let mut sim = Simulation::new(config, bodies).unwrap();
    sim.attract().unwrap();
    for _ in 0..1000 {
        sim.step().unwrap();
    }
    let heavy = sim.bodies().iter().find(|b| b.mass == mass).unwrap().pos;
    let light = sim.bodies().iter().find(|b| b.mass == 1.0).unwrap().pos;
    let r = (light - heavy).magnitude();
    assert!((r - radius).abs() < 0.02 * radius, "drifted to {}", r);
}

// ==================================================================================
// Whole scenario
// ==================================================================================

#[test]
fn uniform_disc_steps_stay_finite() {
    let bodies = scenario::uniform_disc(400, 0).unwrap();
    let mut sim = Simulation::new(Config::default(), bodies).unwrap();
    for _ in 0..5 {
        sim.step().unwrap();
    }
    assert_eq!(sim.frame(), 5);
    assert_eq!(sim.bodies().len(), 400);
    assert!(sim
        .bodies()
        .iter()
        .all(|b| b.pos.x.is_finite() && b.pos.y.is_finite() && b.vel.x.is_finite()));
    let total: f32 = sim.bodies().iter().map(|b| b.mass).sum();
    let root = sim.nodes()[physics::ROOT];
    assert!((root.mass - total).abs() <= 1e-4 * total);
}
