use crate::Body;
use cgmath::{prelude::*, Vector2};

/// Axis-aligned square of side `size` centered at `center`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub center: Vector2<f32>,
    pub size: f32,
}
unsafe impl bytemuck::Zeroable for Quad {}
unsafe impl bytemuck::Pod for Quad {}

impl Quad {
    /// Smallest square centered on the bounding box of `bodies` that covers it.
    /// An empty set gives a degenerate quad at the origin.
    pub fn containing(bodies: &[Body]) -> Quad {
        if bodies.is_empty() {
            return Quad {
                center: Vector2::zero(),
                size: 0.0,
            };
        }
        let mut min = Vector2::new(f32::MAX, f32::MAX);
        let mut max = Vector2::new(f32::MIN, f32::MIN);
        for body in bodies {
            min.x = min.x.min(body.pos.x);
            min.y = min.y.min(body.pos.y);
            max.x = max.x.max(body.pos.x);
            max.y = max.y.max(body.pos.y);
        }
        Quad {
            center: (min + max) * 0.5,
            size: (max.x - min.x).max(max.y - min.y),
        }
    }
    /// Bit 0 of `quadrant` selects the upper x-half, bit 1 the upper y-half.
    pub fn into_quadrant(mut self, quadrant: usize) -> Quad {
        self.size *= 0.5;
        self.center.x += ((quadrant & 1) as f32 - 0.5) * self.size;
        self.center.y += ((quadrant >> 1) as f32 - 0.5) * self.size;
        self
    }
    pub fn subdivide(&self) -> [Quad; 4] {
        [0, 1, 2, 3].map(|quadrant| self.into_quadrant(quadrant))
    }
    /// Inclusive on every edge.
    pub fn contains(&self, pos: Vector2<f32>) -> bool {
        let half = self.size * 0.5;
        (pos.x - self.center.x).abs() <= half && (pos.y - self.center.y).abs() <= half
    }
    /// Which quadrant of this quad `pos` falls in, using the strict less-than
    /// split the tree partition uses.
    pub fn quadrant_of(&self, pos: Vector2<f32>) -> usize {
        (pos.x >= self.center.x) as usize | ((pos.y >= self.center.y) as usize) << 1
    }
}
