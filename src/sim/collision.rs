//! Narrow phase: exact overlap tests between world shapes
//!
//! Two axis-aligned boxes use the interval test; every other combination
//! goes through the separating-axis test on their outlines.

use glam::Vec2;

use super::aabb::Aabb;
use super::polygon::{self, FeatureId};
use super::shape::WorldShape;

/// Result of a positive narrow-phase test
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    /// Minimum translation vector, pointing from the first shape to the second
    pub mtv: Vec2,
    /// Unit direction of `mtv`
    pub normal: Vec2,
    /// World contact points ordered by feature id
    pub points: Vec<(Vec2, FeatureId)>,
}

/// Test two shapes. `None` means they do not overlap by a positive amount.
pub fn collide_shapes(a: &WorldShape, b: &WorldShape) -> Option<Manifold> {
    match (a, b) {
        (WorldShape::Aabb(a), WorldShape::Aabb(b)) => collide_boxes(a, b),
        _ => {
            let (pa, pb) = (a.points(), b.points());
            let sep = polygon::separate(&pa, &pb)?;
            let points = polygon::contact_points(&pa, &pb, sep.normal);
            Some(Manifold {
                mtv: sep.normal * sep.depth,
                normal: sep.normal,
                points,
            })
        }
    }
}

fn collide_boxes(a: &Aabb, b: &Aabb) -> Option<Manifold> {
    let mtv = a.collide(b)?;
    let normal = mtv.normalize_or_zero();
    let overlap = a.intersection(b)?;

    // The face of the overlap region that lies on `b`'s penetrating edge,
    // tagged with `a`'s reference edge and `b`'s corner indices (corners run
    // top-left, top-right, bottom-right, bottom-left)
    let (edge, first, second) = if normal.y > 0.0 {
        (2, (Vec2::new(overlap.min.x, overlap.min.y), 0), (Vec2::new(overlap.max.x, overlap.min.y), 1))
    } else if normal.y < 0.0 {
        (0, (Vec2::new(overlap.min.x, overlap.max.y), 3), (Vec2::new(overlap.max.x, overlap.max.y), 2))
    } else if normal.x > 0.0 {
        (1, (Vec2::new(overlap.min.x, overlap.min.y), 0), (Vec2::new(overlap.min.x, overlap.max.y), 3))
    } else {
        (3, (Vec2::new(overlap.max.x, overlap.min.y), 1), (Vec2::new(overlap.max.x, overlap.max.y), 2))
    };

    let mut points: Vec<(Vec2, FeatureId)> = [first, second]
        .into_iter()
        .map(|(point, vertex)| {
            (
                point,
                FeatureId {
                    reference_edge: edge,
                    incident_vertex: vertex,
                    flipped: false,
                },
            )
        })
        .collect();
    points.sort_by_key(|(_, id)| *id);
    Some(Manifold { mtv, normal, points })
}
