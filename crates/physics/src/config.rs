pub const DELTA_TIME: f32 = 0.05;
pub const THETA: f32 = 1.0;
pub const EPSILON: f32 = 1.0;
pub const LEAF_CAPACITY: usize = 16;

/// Tunables of a [`Simulation`](crate::Simulation).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// Fixed integration step.
    pub dt: f32,
    /// Barnes-Hut opening threshold; a node is approximated once `size / distance < theta`.
    pub theta: f32,
    /// Gravitational softening length.
    pub eps: f32,
    /// Most bodies a leaf may hold before it is subdivided.
    pub leaf_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dt: DELTA_TIME,
            theta: THETA,
            eps: EPSILON,
            leaf_cap: LEAF_CAPACITY,
        }
    }
}
