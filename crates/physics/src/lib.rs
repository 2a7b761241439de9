//! Barnes-Hut gravity and pairwise elastic collisions in two dimensions.

mod body;
mod config;
mod error;
mod quad;
mod quadtree;
pub mod scenario;
mod simulation;

pub use body::Body;
pub use config::{Config, DELTA_TIME, EPSILON, LEAF_CAPACITY, THETA};
pub use error::{Error, Result};
pub use quad::Quad;
pub use quadtree::{QuadNode, QuadTree, Span, ROOT};
pub use simulation::{Rect, Simulation};

pub use cgmath::Vector2;
