//! Line list builder

use glam::Vec2;

use super::vertex::{DebugVertex, colors};
use crate::sim::{Aabb, BodySet, CollisionContact, CollisionType};

/// Half size of the cross drawn at each contact point
const POINT_MARK: f32 = 2.0;
/// Length of the drawn contact normal
const NORMAL_LENGTH: f32 = 10.0;

/// Accumulates line segments as vertex pairs
#[derive(Debug, Clone, Default)]
pub struct DebugLines {
    vertices: Vec<DebugVertex>,
}

impl DebugLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn vertices(&self) -> &[DebugVertex] {
        &self.vertices
    }

    pub fn segment_count(&self) -> usize {
        self.vertices.len() / 2
    }

    /// Raw bytes for a GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn push_line(&mut self, a: Vec2, b: Vec2, color: [f32; 4]) {
        self.vertices.push(DebugVertex::at(a, color));
        self.vertices.push(DebugVertex::at(b, color));
    }

    /// Closed outline through `points`
    pub fn push_outline(&mut self, points: &[Vec2], color: [f32; 4]) {
        if points.len() < 2 {
            return;
        }
        for i in 0..points.len() {
            self.push_line(points[i], points[(i + 1) % points.len()], color);
        }
    }

    pub fn push_rect(&mut self, bounds: &Aabb, color: [f32; 4]) {
        self.push_outline(&bounds.corners(), color);
    }

    pub fn push_cross(&mut self, at: Vec2, color: [f32; 4]) {
        self.push_line(at - Vec2::splat(POINT_MARK), at + Vec2::splat(POINT_MARK), color);
        self.push_line(
            at + Vec2::new(-POINT_MARK, POINT_MARK),
            at + Vec2::new(POINT_MARK, -POINT_MARK),
            color,
        );
    }

    /// Every sub-shape outline, colored by collision type
    pub fn draw_bodies(&mut self, bodies: &BodySet) {
        for body in bodies.iter() {
            let color = match body.collision_type() {
                CollisionType::Active => colors::ACTIVE_BODY,
                CollisionType::Fixed => colors::FIXED_BODY,
                CollisionType::Passive | CollisionType::PreventCollision => colors::PASSIVE_BODY,
            };
            for shape in body.world_shapes() {
                self.push_outline(&shape.points(), color);
            }
        }
    }

    /// Contact points and normals; canceled contacts are greyed out
    pub fn draw_contacts(&mut self, contacts: &[CollisionContact]) {
        for contact in contacts {
            let (point_color, normal_color) = if contact.is_canceled() {
                (colors::CANCELED_CONTACT, colors::CANCELED_CONTACT)
            } else {
                (colors::CONTACT_POINT, colors::CONTACT_NORMAL)
            };
            for p in &contact.points {
                self.push_cross(p.point, point_color);
                self.push_line(p.point, p.point + contact.normal * NORMAL_LENGTH, normal_color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Body, BodyId};

    #[test]
    fn test_rect_is_four_segments() {
        let mut lines = DebugLines::new();
        lines.push_rect(&Aabb::new(Vec2::ZERO, Vec2::ONE), colors::ACTIVE_BODY);
        assert_eq!(lines.segment_count(), 4);
        assert_eq!(lines.vertices()[1].position, [1.0, 0.0]);
        assert_eq!(lines.as_bytes().len(), 8 * DebugVertex::STRIDE);
    }

    #[test]
    fn test_draw_bodies_and_contacts() {
        let bodies: BodySet = [
            Body::builder().rect(10.0, 10.0).build(BodyId(0)).unwrap(),
            Body::builder()
                .pos(9.0, 0.0)
                .rect(10.0, 10.0)
                .collision_type(CollisionType::Fixed)
                .build(BodyId(1))
                .unwrap(),
        ]
        .into_iter()
        .collect();
        let mut lines = DebugLines::new();
        lines.draw_bodies(&bodies);
        assert_eq!(lines.segment_count(), 8);

        let contacts = crate::sim::Pair::new(BodyId(0), BodyId(1)).collide(&bodies).unwrap();
        lines.clear();
        lines.draw_contacts(&contacts);
        // Two points, each a cross plus a normal
        assert_eq!(lines.segment_count(), 6);
        assert_eq!(lines.vertices()[0].color, colors::CONTACT_POINT);
    }
}
