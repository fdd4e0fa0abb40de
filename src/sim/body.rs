//! Bodies and the body set owned by the scene
//!
//! The collision pipeline only ever reads a body's identity, collision type
//! and group; it writes position and velocity.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;
use super::shape::{Shape, WorldShape};
use crate::error::CollisionError;

/// Stable body identity, used as the tree and lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a body takes part in collisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionType {
    /// Never paired with anything
    PreventCollision,
    /// Reports collisions but is never pushed and never pushes
    Passive,
    /// Moved by the solver
    #[default]
    Active,
    /// Takes part in collisions but is never moved by the solver
    Fixed,
}

/// Category/mask bit filter deciding which bodies may pair up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionGroup {
    pub category: u32,
    pub mask: u32,
}

impl Default for CollisionGroup {
    fn default() -> Self {
        Self::ALL
    }
}

impl CollisionGroup {
    /// Collides with everything
    pub const ALL: CollisionGroup = CollisionGroup {
        category: u32::MAX,
        mask: u32::MAX,
    };

    pub const fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// Both sides must accept the other's category
    pub fn can_collide(&self, other: &CollisionGroup) -> bool {
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }
}

/// World-space geometry cached for the current transform
#[derive(Debug, Clone)]
struct WorldGeometry {
    shapes: Vec<WorldShape>,
    bounds: Aabb,
}

/// A collidable body
#[derive(Debug, Clone)]
pub struct Body {
    id: BodyId,
    pos: Vec2,
    rotation: f32,
    vel: Vec2,
    mass: f32,
    collision_type: CollisionType,
    group: CollisionGroup,
    active: bool,
    shapes: Vec<Shape>,
    /// Reset whenever the transform changes, rebuilt on first read
    geometry: OnceCell<WorldGeometry>,
}

impl Body {
    pub fn builder() -> BodyBuilder {
        BodyBuilder::default()
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn vel(&self) -> Vec2 {
        self.vel
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn collision_type(&self) -> CollisionType {
        self.collision_type
    }

    pub fn group(&self) -> CollisionGroup {
        self.group
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Inverse mass as seen by the solver; zero for anything it must not move
    pub fn inverse_mass(&self) -> f32 {
        match self.collision_type {
            CollisionType::Active => 1.0 / self.mass,
            _ => 0.0,
        }
    }

    pub fn set_pos(&mut self, pos: Vec2) {
        if pos != self.pos {
            self.pos = pos;
            self.geometry = OnceCell::new();
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.set_pos(self.pos + delta);
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        if rotation != self.rotation {
            self.rotation = rotation;
            self.geometry = OnceCell::new();
        }
    }

    pub fn set_vel(&mut self, vel: Vec2) {
        self.vel = vel;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn geometry(&self) -> &WorldGeometry {
        self.geometry.get_or_init(|| {
            let shapes: Vec<WorldShape> = self
                .shapes
                .iter()
                .map(|s| s.to_world(self.pos, self.rotation))
                .collect();
            let bounds = shapes
                .iter()
                .map(WorldShape::bounds)
                .reduce(|a, b| a.combine(&b))
                .unwrap_or_else(|| Aabb::new(self.pos, self.pos));
            WorldGeometry { shapes, bounds }
        })
    }

    /// Sub-shapes placed at the current transform
    pub fn world_shapes(&self) -> &[WorldShape] {
        &self.geometry().shapes
    }

    /// Tight world bounds around every sub-shape
    pub fn bounds(&self) -> Aabb {
        self.geometry().bounds
    }
}

/// Builder for [`Body`]
#[derive(Debug, Clone)]
pub struct BodyBuilder {
    pos: Vec2,
    rotation: f32,
    vel: Vec2,
    mass: f32,
    collision_type: CollisionType,
    group: CollisionGroup,
    active: bool,
    shapes: Vec<Shape>,
}

impl Default for BodyBuilder {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            rotation: 0.0,
            vel: Vec2::ZERO,
            mass: 10.0,
            collision_type: CollisionType::Active,
            group: CollisionGroup::ALL,
            active: true,
            shapes: Vec::new(),
        }
    }
}

impl BodyBuilder {
    pub fn pos(mut self, x: f32, y: f32) -> Self {
        self.pos = Vec2::new(x, y);
        self
    }

    pub fn rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn vel(mut self, x: f32, y: f32) -> Self {
        self.vel = Vec2::new(x, y);
        self
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn collision_type(mut self, collision_type: CollisionType) -> Self {
        self.collision_type = collision_type;
        self
    }

    pub fn group(mut self, group: CollisionGroup) -> Self {
        self.group = group;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Add a sub-shape; call repeatedly for a composite collider
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Shorthand for a single centered box
    pub fn rect(self, width: f32, height: f32) -> Self {
        self.shape(Shape::rect(width, height))
    }

    pub fn build(self, id: BodyId) -> Result<Body, CollisionError> {
        if self.shapes.is_empty() {
            return Err(CollisionError::InvalidBody("body needs at least one shape"));
        }
        for shape in &self.shapes {
            shape.validate()?;
        }
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(CollisionError::InvalidBody("mass must be positive and finite"));
        }
        if !self.pos.is_finite() || !self.vel.is_finite() || !self.rotation.is_finite() {
            return Err(CollisionError::InvalidBody("transform is not finite"));
        }
        Ok(Body {
            id,
            pos: self.pos,
            rotation: self.rotation,
            vel: self.vel,
            mass: self.mass,
            collision_type: self.collision_type,
            group: self.group,
            active: self.active,
            shapes: self.shapes,
            geometry: OnceCell::new(),
        })
    }
}

/// Every body of a scene, iterated in id order
#[derive(Debug, Clone, Default)]
pub struct BodySet {
    bodies: BTreeMap<BodyId, Body>,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: Body) -> Result<BodyId, CollisionError> {
        let id = body.id();
        if self.bodies.contains_key(&id) {
            return Err(CollisionError::DuplicateBody(id));
        }
        self.bodies.insert(id, body);
        Ok(id)
    }

    pub fn remove(&mut self, id: BodyId) -> Result<Body, CollisionError> {
        self.bodies.remove(&id).ok_or(CollisionError::UnknownBody(id))
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.bodies.values_mut()
    }
}

impl FromIterator<Body> for BodySet {
    /// Later bodies with a repeated id replace earlier ones
    fn from_iter<I: IntoIterator<Item = Body>>(iter: I) -> Self {
        Self {
            bodies: iter.into_iter().map(|b| (b.id(), b)).collect(),
        }
    }
}
