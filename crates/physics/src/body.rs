use cgmath::{prelude::*, Vector2};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Body {
    pub pos: Vector2<f32>,
    pub vel: Vector2<f32>,
    pub acc: Vector2<f32>,
    pub mass: f32,
    pub radius: f32,
}
unsafe impl bytemuck::Zeroable for Body {}
unsafe impl bytemuck::Pod for Body {}

impl Body {
    pub fn new(pos: Vector2<f32>, vel: Vector2<f32>, mass: f32, radius: f32) -> Body {
        Body {
            pos,
            vel,
            acc: Vector2::zero(),
            mass,
            radius,
        }
    }
    /// Semi-implicit Euler: the velocity is kicked by the acceleration of the
    /// previous force evaluation before the position is drifted.
    pub fn update(&mut self, dt: f32) {
        self.vel += self.acc * dt;
        self.pos += self.vel * dt;
    }
}
