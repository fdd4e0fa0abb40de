//! Collider shapes in local and world space

use glam::Vec2;

use super::aabb::Aabb;
use super::polygon::{self, ConvexPolygon};
use super::ray::Ray;
use crate::error::CollisionError;
use crate::rotate;

/// A collider shape in body-local space
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Rectangle with the given half extents, centered `offset` from the body
    Box { half_extents: Vec2, offset: Vec2 },
    /// Arbitrary convex outline
    Polygon(ConvexPolygon),
}

impl Shape {
    /// Rectangle of `width` x `height` centered on the body
    pub fn rect(width: f32, height: f32) -> Self {
        Self::rect_at(width, height, Vec2::ZERO)
    }

    pub fn rect_at(width: f32, height: f32, offset: Vec2) -> Self {
        Shape::Box {
            half_extents: Vec2::new(width, height) * 0.5,
            offset,
        }
    }

    pub fn polygon(points: Vec<Vec2>) -> Result<Self, CollisionError> {
        Ok(Shape::Polygon(ConvexPolygon::new(points)?))
    }

    pub(crate) fn validate(&self) -> Result<(), CollisionError> {
        match self {
            Shape::Box { half_extents, offset } => {
                if !half_extents.is_finite() || !offset.is_finite() {
                    return Err(CollisionError::InvalidShape("box extents are not finite"));
                }
                if half_extents.x <= 0.0 || half_extents.y <= 0.0 {
                    return Err(CollisionError::InvalidShape("box must have positive size"));
                }
                Ok(())
            }
            Shape::Polygon(_) => Ok(()),
        }
    }

    /// Place the shape in the world. A box stays axis-aligned only while the
    /// body is unrotated; otherwise it becomes a polygon.
    pub fn to_world(&self, pos: Vec2, rotation: f32) -> WorldShape {
        match self {
            Shape::Box { half_extents, offset } if rotation == 0.0 => {
                WorldShape::Aabb(Aabb::from_center(pos + *offset, *half_extents))
            }
            Shape::Box { half_extents, offset } => {
                let center = pos + rotate(*offset, rotation);
                WorldShape::Polygon(ConvexPolygon::rect(*half_extents, Vec2::ZERO).to_world(center, rotation))
            }
            Shape::Polygon(poly) => WorldShape::Polygon(poly.to_world(pos, rotation)),
        }
    }
}

/// A shape resolved to world coordinates for the current transform
#[derive(Debug, Clone, PartialEq)]
pub enum WorldShape {
    Aabb(Aabb),
    Polygon(Vec<Vec2>),
}

impl WorldShape {
    pub fn bounds(&self) -> Aabb {
        match self {
            WorldShape::Aabb(bb) => *bb,
            WorldShape::Polygon(points) => Aabb::from_points(points),
        }
    }

    /// Outline vertices (box corners for an AABB)
    pub fn points(&self) -> Vec<Vec2> {
        match self {
            WorldShape::Aabb(bb) => bb.corners().to_vec(),
            WorldShape::Polygon(points) => points.clone(),
        }
    }

    pub fn center(&self) -> Vec2 {
        match self {
            WorldShape::Aabb(bb) => bb.center(),
            WorldShape::Polygon(points) => polygon::centroid(points),
        }
    }

    /// Exact ray test, returning `(distance, normal)` of the entry point
    pub fn ray_cast(&self, ray: &Ray, max_distance: f32) -> Option<(f32, Vec2)> {
        match self {
            WorldShape::Aabb(bb) => {
                let t = bb.ray_cast(ray, max_distance)?;
                let hit = ray.at(t);
                // Normal of the face closest to the hit point
                let local = hit - bb.center();
                let half = bb.half_extents();
                let dx = half.x - local.x.abs();
                let dy = half.y - local.y.abs();
                let normal = if dx < dy {
                    Vec2::new(local.x.signum(), 0.0)
                } else {
                    Vec2::new(0.0, local.y.signum())
                };
                Some((t, normal))
            }
            WorldShape::Polygon(points) => polygon::ray_cast(points, ray, max_distance),
        }
    }
}
