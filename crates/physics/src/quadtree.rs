//! Flattened Barnes-Hut quadtree.
//!
//! Nodes live in one `Vec` and refer to each other by index. A branch stores the
//! index of the first of its four contiguous children, and every node stores
//! `next`, the node to continue with once its subtree is done: the next sibling,
//! or for the last sibling the parent's own `next`. The root points at itself,
//! which ends a traversal. Walking the tree therefore needs neither recursion
//! nor an explicit stack.

use crate::{Body, Config, Quad, Result};
use cgmath::{prelude::*, Vector2};
use std::ops::Range;

pub const ROOT: usize = 0;

/// Half-open index range into the body slice the tree was built from.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub begin: usize,
    pub end: usize,
}
unsafe impl bytemuck::Zeroable for Span {}
unsafe impl bytemuck::Pod for Span {}

impl Span {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }
    pub fn len(&self) -> usize {
        self.end - self.begin
    }
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
    pub fn range(&self) -> Range<usize> {
        self.begin..self.end
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadNode {
    /// First of four children, or `0` for a leaf (the root is never a child).
    pub children: usize,
    pub next: usize,
    /// Center of mass once the tree is built.
    pub pos: Vector2<f32>,
    pub mass: f32,
    pub quad: Quad,
    pub bodies: Span,
}
unsafe impl bytemuck::Zeroable for QuadNode {}
unsafe impl bytemuck::Pod for QuadNode {}

impl QuadNode {
    pub fn new(next: usize, quad: Quad, bodies: Span) -> Self {
        Self {
            children: 0,
            next,
            pos: Vector2::zero(),
            mass: 0.0,
            quad,
            bodies,
        }
    }
    pub fn is_leaf(&self) -> bool {
        self.children == 0
    }
    pub fn is_branch(&self) -> bool {
        self.children != 0
    }
    pub fn is_empty(&self) -> bool {
        self.mass == 0.0
    }
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    theta_sq: f32,
    eps_sq: f32,
    leaf_cap: usize,
    nodes: Vec<QuadNode>,
    parents: Vec<usize>,
}

impl QuadTree {
    pub fn new(theta: f32, eps: f32, leaf_cap: usize) -> Self {
        Self {
            theta_sq: theta * theta,
            eps_sq: eps * eps,
            leaf_cap,
            nodes: Vec::new(),
            parents: Vec::new(),
        }
    }
    /// Like [`QuadTree::new`], with room reserved for a tree over `n` bodies.
    pub fn with_capacity(theta: f32, eps: f32, leaf_cap: usize, n: usize) -> Result<Self> {
        let mut tree = Self::new(theta, eps, leaf_cap);
        tree.nodes.try_reserve(n)?;
        tree.parents.try_reserve(n)?;
        Ok(tree)
    }
    pub fn from_config(config: &Config, n: usize) -> Result<Self> {
        Self::with_capacity(config.theta, config.eps, config.leaf_cap, n)
    }
    pub fn nodes(&self) -> &[QuadNode] {
        &self.nodes
    }
    /// Indices of every subdivided node, in creation order.
    pub fn parents(&self) -> &[usize] {
        &self.parents
    }
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.parents.clear();
    }

    /// Rebuilds the tree over `bodies`, reordering them in place so that every
    /// node owns a contiguous range.
    pub fn build(&mut self, bodies: &mut [Body]) -> Result<()> {
        self.clear();

        let quad = Quad::containing(bodies);
        self.nodes.try_reserve(1)?;
        self.nodes
            .push(QuadNode::new(ROOT, quad, Span::new(0, bodies.len())));

        // Children are appended behind the cursor, so this visits them later
        // in the same loop.
        let mut node = ROOT;
        while node < self.nodes.len() {
            let QuadNode {
                quad, bodies: span, ..
            } = self.nodes[node];
            if self.leaf_cap < span.len() && is_divisible(&quad) {
                self.subdivide(node, bodies, span)?;
            } else {
                let leaf = &mut self.nodes[node];
                for body in &bodies[span.range()] {
                    leaf.pos += body.pos * body.mass;
                    leaf.mass += body.mass;
                }
            }
            node += 1;
        }

        self.propagate();
        log::debug!(
            "Built quadtree over {} bodies: {} nodes, {} parents",
            bodies.len(),
            self.nodes.len(),
            self.parents.len()
        );
        Ok(())
    }

    fn subdivide(&mut self, node: usize, bodies: &mut [Body], span: Span) -> Result<()> {
        let center = self.nodes[node].quad.center;
        let mut split = [span.begin, 0, 0, 0, span.end];

        split[2] = split[0] + partition(&mut bodies[split[0]..split[4]], |b| b.pos.y < center.y);
        split[1] = split[0] + partition(&mut bodies[split[0]..split[2]], |b| b.pos.x < center.x);
        split[3] = split[2] + partition(&mut bodies[split[2]..split[4]], |b| b.pos.x < center.x);

        self.parents.try_reserve(1)?;
        self.nodes.try_reserve(4)?;
        self.parents.push(node);

        let children = self.nodes.len();
        let parent = &mut self.nodes[node];
        parent.children = children;
        let nexts = [children + 1, children + 2, children + 3, parent.next];
        let quads = parent.quad.subdivide();
        for quadrant in 0..4 {
            self.nodes.push(QuadNode::new(
                nexts[quadrant],
                quads[quadrant],
                Span::new(split[quadrant], split[quadrant + 1]),
            ));
        }
        Ok(())
    }

    /// Sums children into parents bottom-up, then turns every node's
    /// mass-weighted position sum into a center of mass.
    pub fn propagate(&mut self) {
        for &node in self.parents.iter().rev() {
            let first = self.nodes[node].children;
            let (pos, mass) = self.nodes[first..first + 4]
                .iter()
                .fold((Vector2::zero(), 0.0), |(pos, mass), child| {
                    (pos + child.pos, mass + child.mass)
                });
            let parent = &mut self.nodes[node];
            parent.pos = pos;
            parent.mass = mass;
        }
        for node in &mut self.nodes {
            node.pos /= node.mass.max(f32::MIN_POSITIVE);
        }
    }

    /// Softened gravitational acceleration at `pos`. `bodies` must be the slice
    /// the tree was last built from.
    pub fn accelerate(&self, pos: Vector2<f32>, bodies: &[Body]) -> Vector2<f32> {
        self.walk(pos, bodies).0
    }

    /// Number of nodes [`QuadTree::accelerate`] touches for `pos`.
    pub fn visits(&self, pos: Vector2<f32>, bodies: &[Body]) -> usize {
        self.walk(pos, bodies).1
    }

    fn walk(&self, pos: Vector2<f32>, bodies: &[Body]) -> (Vector2<f32>, usize) {
        let mut acc = Vector2::zero();
        let mut visits = 0;
        if self.nodes.is_empty() {
            return (acc, visits);
        }

        let mut node = ROOT;
        loop {
            let n = &self.nodes[node];
            visits += 1;

            let d = n.pos - pos;
            let d_sq = d.magnitude2();
            let far_enough = n.quad.size * n.quad.size < d_sq * self.theta_sq;

            if far_enough || n.is_leaf() {
                if far_enough {
                    let denom = (d_sq + self.eps_sq) * d_sq.sqrt();
                    acc += d * (n.mass / denom);
                } else {
                    for body in &bodies[n.bodies.range()] {
                        let d = body.pos - pos;
                        let d_sq = d.magnitude2();
                        let denom = (d_sq + self.eps_sq) * d_sq.sqrt();
                        // A coincident body gives 0/0 or m/0; clamp so it adds nothing.
                        acc += d * (body.mass / denom).min(f32::MAX);
                    }
                }
                if n.next == ROOT {
                    break;
                }
                node = n.next;
            } else {
                node = n.children;
            }
        }
        (acc, visits)
    }
}

/// A quad whose quarter-size offset no longer moves its center cannot separate
/// its bodies any further.
fn is_divisible(quad: &Quad) -> bool {
    let offset = quad.size * 0.25;
    quad.center.x + offset != quad.center.x || quad.center.y + offset != quad.center.y
}

/// Moves every body satisfying `pred` to the front and returns how many did.
fn partition(bodies: &mut [Body], pred: impl Fn(&Body) -> bool) -> usize {
    let mut lhs = 0;
    let mut rhs = bodies.len();
    while lhs < rhs {
        if pred(&bodies[lhs]) {
            lhs += 1;
        } else {
            rhs -= 1;
            bodies.swap(lhs, rhs);
        }
    }
    lhs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32, mass: f32) -> Body {
        Body::new(Vector2::new(x, y), Vector2::zero(), mass, 1.0)
    }

    #[test]
    fn partition_splits_on_predicate() {
        let mut bodies: Vec<Body> = [3.0, -1.0, 2.0, -5.0, 0.0, -2.0]
            .into_iter()
            .map(|x| at(x, 0.0, 1.0))
            .collect();
        let split = partition(&mut bodies, |b| b.pos.x < 0.0);
        assert_eq!(split, 3);
        assert!(bodies[..split].iter().all(|b| b.pos.x < 0.0));
        assert!(bodies[split..].iter().all(|b| b.pos.x >= 0.0));
    }

    #[test]
    fn partition_of_nothing() {
        assert_eq!(partition(&mut [], |_| true), 0);
    }

    #[test]
    fn small_set_stays_a_single_leaf() {
        let mut tree = QuadTree::new(1.0, 1.0, 4);
        let mut bodies = vec![at(0.0, 0.0, 1.0), at(2.0, 0.0, 3.0)];
        tree.build(&mut bodies).unwrap();
        assert_eq!(tree.nodes().len(), 1);
        assert!(tree.parents().is_empty());
        let root = tree.nodes()[ROOT];
        assert!(root.is_leaf());
        assert_eq!(root.next, ROOT);
        assert_eq!(root.mass, 4.0);
        assert_eq!(root.pos, Vector2::new(1.5, 0.0));
    }

    #[test]
    fn one_subdivision_links_siblings() {
        let mut tree = QuadTree::new(1.0, 1.0, 1);
        let mut bodies = vec![
            at(-1.0, -1.0, 1.0),
            at(1.0, -1.0, 1.0),
            at(-1.0, 1.0, 1.0),
            at(1.0, 1.0, 1.0),
        ];
        tree.build(&mut bodies).unwrap();
        assert_eq!(tree.parents(), &[ROOT]);
        let nodes = tree.nodes();
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[ROOT].children, 1);
        let nexts: Vec<usize> = nodes[1..].iter().map(|n| n.next).collect();
        assert_eq!(nexts, vec![2, 3, 4, ROOT]);
        for (quadrant, child) in nodes[1..].iter().enumerate() {
            assert_eq!(child.bodies.len(), 1);
            let body = &bodies[child.bodies.begin];
            assert_eq!(nodes[ROOT].quad.quadrant_of(body.pos), quadrant);
        }
    }

    #[test]
    fn empty_nodes_have_no_mass() {
        let mut tree = QuadTree::new(1.0, 1.0, 1);
        let mut bodies = vec![at(-4.0, -4.0, 1.0), at(4.0, 4.0, 2.0)];
        tree.build(&mut bodies).unwrap();
        let nodes = tree.nodes();
        assert!(nodes[2].is_empty());
        assert!(nodes[3].is_empty());
        assert_eq!(nodes[2].pos, Vector2::zero());
    }

    #[test]
    fn empty_body_set_builds_a_root() {
        let mut tree = QuadTree::new(1.0, 1.0, 4);
        tree.build(&mut []).unwrap();
        assert_eq!(tree.nodes().len(), 1);
        assert!(tree.nodes()[ROOT].is_empty());
        assert_eq!(tree.accelerate(Vector2::new(1.0, 1.0), &[]), Vector2::zero());
    }

    #[test]
    fn coincident_bodies_do_not_subdivide_forever() {
        let mut tree = QuadTree::new(1.0, 1.0, 2);
        let mut bodies = vec![at(5.0, 5.0, 1.0); 10];
        tree.build(&mut bodies).unwrap();
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.nodes()[ROOT].mass, 10.0);
    }

    #[test]
    fn rebuild_retains_capacity() {
        let mut tree = QuadTree::with_capacity(1.0, 1.0, 1, 64).unwrap();
        let mut bodies: Vec<Body> = (0..32).map(|i| at(i as f32, (i * 7 % 5) as f32, 1.0)).collect();
        tree.build(&mut bodies).unwrap();
        let capacity = tree.nodes.capacity();
        tree.build(&mut bodies).unwrap();
        assert_eq!(tree.nodes.capacity(), capacity);
    }

    #[test]
    fn self_interaction_contributes_nothing() {
        let mut tree = QuadTree::new(0.0, 0.0, 4);
        let mut bodies = vec![at(1.0, 1.0, 1.0)];
        tree.build(&mut bodies).unwrap();
        assert_eq!(tree.accelerate(bodies[0].pos, &bodies), Vector2::zero());
    }
}
