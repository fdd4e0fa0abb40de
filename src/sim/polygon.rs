//! Convex polygons and the separating-axis test
//!
//! The narrow phase for anything that is not a pair of unrotated boxes ends
//! up here. All functions take world-space vertex slices so the same code
//! serves polygons, rotated boxes and boxes mixed with polygons.

use glam::Vec2;

use super::ray::Ray;
use crate::consts::SAT_TIE_EPSILON;
use crate::error::CollisionError;
use crate::{project, rotate};

/// Convex polygon in body-local space
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    points: Vec<Vec2>,
}

impl ConvexPolygon {
    /// Validate and build a polygon.
    ///
    /// Needs at least three finite points forming a convex outline with
    /// non-zero area. Either winding is accepted; points are stored with a
    /// consistent winding.
    pub fn new(mut points: Vec<Vec2>) -> Result<Self, CollisionError> {
        if points.len() < 3 {
            return Err(CollisionError::InvalidShape("polygon needs at least 3 points"));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(CollisionError::InvalidShape("polygon point is not finite"));
        }

        let area = signed_area(&points);
        if area.abs() <= f32::EPSILON {
            return Err(CollisionError::InvalidShape("polygon has zero area"));
        }
        if area < 0.0 {
            points.reverse();
        }

        let n = points.len();
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            let c = points[(i + 2) % n];
            if (b - a).perp_dot(c - b) < -f32::EPSILON {
                return Err(CollisionError::InvalidShape("polygon is not convex"));
            }
        }

        Ok(Self { points })
    }

    /// Rectangle centered on `offset`
    pub fn rect(half_extents: Vec2, offset: Vec2) -> Self {
        let h = half_extents;
        Self {
            points: vec![
                offset + Vec2::new(-h.x, -h.y),
                offset + Vec2::new(h.x, -h.y),
                offset + Vec2::new(h.x, h.y),
                offset + Vec2::new(-h.x, h.y),
            ],
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// World-space vertices for a body at `pos` rotated by `rotation`
    pub fn to_world(&self, pos: Vec2, rotation: f32) -> Vec<Vec2> {
        self.points.iter().map(|p| pos + rotate(*p, rotation)).collect()
    }
}

/// Shoelace signed area (positive for the stored winding)
fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

/// Vertex average, good enough as an interior point of a convex outline
pub fn centroid(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }
    points.iter().copied().sum::<Vec2>() / points.len() as f32
}

/// Unit normal of edge `i` (from vertex `i` to `i + 1`) pointing out of the polygon
pub fn edge_normal(points: &[Vec2], i: usize) -> Vec2 {
    let a = points[i];
    let b = points[(i + 1) % points.len()];
    let n = (b - a).perp().normalize_or_zero();
    if n.dot(a - centroid(points)) < 0.0 { -n } else { n }
}

/// Index and position of the vertex furthest along `dir`
pub fn support(points: &[Vec2], dir: Vec2) -> (usize, Vec2) {
    let mut best = 0;
    let mut best_dot = f32::NEG_INFINITY;
    for (i, p) in points.iter().enumerate() {
        let d = p.dot(dir);
        if d > best_dot {
            best_dot = d;
            best = i;
        }
    }
    (best, points[best])
}

/// Outcome of a successful separating-axis test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Unit axis pointing from the first polygon toward the second
    pub normal: Vec2,
    /// Distance the first polygon must move against `normal` to separate
    pub depth: f32,
}

/// Separating-axis test between two convex outlines.
///
/// Candidate axes are the edge normals of `a` followed by those of `b`, in
/// vertex order. Any axis without positive overlap means the shapes are
/// disjoint. Otherwise the axis with the smallest push wins; an axis only
/// replaces the current best if it is smaller by more than
/// [`SAT_TIE_EPSILON`], so equal depths keep the first axis tested.
pub fn separate(a: &[Vec2], b: &[Vec2]) -> Option<Separation> {
    let center_delta = centroid(b) - centroid(a);
    let mut best: Option<Separation> = None;

    let axes = (0..a.len())
        .map(|i| edge_normal(a, i))
        .chain((0..b.len()).map(|i| edge_normal(b, i)));

    for axis in axes {
        if axis == Vec2::ZERO {
            continue;
        }
        let (min_a, max_a) = project(a, axis);
        let (min_b, max_b) = project(b, axis);
        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return None;
        }

        // Push needed along +axis (a sits before b) or -axis (a sits after b)
        let forward = max_a - min_b;
        let backward = max_b - min_a;
        let candidate = if forward < backward
            || (forward == backward && center_delta.dot(axis) >= 0.0)
        {
            Separation { normal: axis, depth: forward }
        } else {
            Separation { normal: -axis, depth: backward }
        };

        match best {
            Some(current) if candidate.depth >= current.depth - SAT_TIE_EPSILON => {}
            _ => best = Some(candidate),
        }
    }

    best
}

/// Identifies which features produced a contact point so that points can be
/// matched and ordered the same way from one tick to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FeatureId {
    /// Edge of the reference polygon
    pub reference_edge: u8,
    /// Vertex of the incident polygon
    pub incident_vertex: u8,
    /// True when the second polygon provided the reference edge
    pub flipped: bool,
}

#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    point: Vec2,
    vertex: usize,
}

/// Keep the part of `seg` where `dir . p >= min`
fn clip_segment(seg: &[ClipVertex], dir: Vec2, min: f32) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(2);
    let [v0, v1] = [seg[0], seg[1]];
    let d0 = dir.dot(v0.point) - min;
    let d1 = dir.dot(v1.point) - min;
    if d0 >= 0.0 {
        out.push(v0);
    }
    if d1 >= 0.0 {
        out.push(v1);
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        let clipped = if d0 < 0.0 { v0 } else { v1 };
        out.push(ClipVertex {
            point: v0.point + (v1.point - v0.point) * t,
            vertex: clipped.vertex,
        });
    }
    out
}

/// Contact points between two overlapping outlines given the contact normal
/// (pointing from `a` toward `b`).
///
/// Uses reference/incident edge clipping. Points are returned ordered by
/// [`FeatureId`]. Falls back to the deepest vertex of `b` when clipping
/// degenerates.
pub fn contact_points(a: &[Vec2], b: &[Vec2], normal: Vec2) -> Vec<(Vec2, FeatureId)> {
    let best_face = |points: &[Vec2], dir: Vec2| -> (usize, f32) {
        let mut best = 0;
        let mut best_dot = f32::NEG_INFINITY;
        for i in 0..points.len() {
            let d = edge_normal(points, i).dot(dir);
            if d > best_dot + SAT_TIE_EPSILON {
                best_dot = d;
                best = i;
            }
        }
        (best, best_dot)
    };

    let (edge_a, align_a) = best_face(a, normal);
    let (edge_b, align_b) = best_face(b, -normal);

    // Prefer the first polygon as reference unless the second's face is
    // clearly better aligned with the normal
    let flipped = align_b > align_a + 1.0e-3;
    let (reference, incident, ref_edge) = if flipped { (b, a, edge_b) } else { (a, b, edge_a) };

    let ref_normal = edge_normal(reference, ref_edge);
    let v1 = reference[ref_edge];
    let v2 = reference[(ref_edge + 1) % reference.len()];

    // Incident edge: the one most anti-parallel to the reference normal
    let (inc_edge, _) = best_face(incident, -ref_normal);
    let inc_next = (inc_edge + 1) % incident.len();
    let seg = [
        ClipVertex { point: incident[inc_edge], vertex: inc_edge },
        ClipVertex { point: incident[inc_next], vertex: inc_next },
    ];

    let tangent = (v2 - v1).normalize_or_zero();
    let clipped = clip_segment(&seg, tangent, tangent.dot(v1));
    let clipped = if clipped.len() >= 2 {
        clip_segment(&clipped, -tangent, -tangent.dot(v2))
    } else {
        clipped
    };

    let mut points: Vec<(Vec2, FeatureId)> = clipped
        .into_iter()
        .filter(|cv| ref_normal.dot(cv.point - v1) <= 0.0)
        .map(|cv| {
            (
                cv.point,
                FeatureId {
                    reference_edge: ref_edge as u8,
                    incident_vertex: cv.vertex as u8,
                    flipped,
                },
            )
        })
        .collect();

    if points.is_empty() {
        let (index, deepest) = support(b, -normal);
        points.push((
            deepest,
            FeatureId {
                reference_edge: edge_a as u8,
                incident_vertex: index as u8,
                flipped: false,
            },
        ));
    }

    points.sort_by_key(|(_, id)| *id);
    points.dedup_by_key(|(_, id)| *id);
    points
}

/// Ray against a convex outline. Returns `(distance, outward normal)` of the
/// nearest edge hit within `max_distance`.
pub fn ray_cast(points: &[Vec2], ray: &Ray, max_distance: f32) -> Option<(f32, Vec2)> {
    let n = points.len();
    let mut best: Option<(f32, Vec2)> = None;
    for i in 0..n {
        let Some(t) = ray.intersect_segment(points[i], points[(i + 1) % n]) else {
            continue;
        };
        if t > max_distance {
            continue;
        }
        if best.is_none_or(|(bt, _)| t < bt) {
            let mut normal = edge_normal(points, i);
            if normal.dot(ray.dir) > 0.0 {
                normal = -normal;
            }
            best = Some((t, normal));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(center: Vec2, half: f32) -> Vec<Vec2> {
        ConvexPolygon::rect(Vec2::splat(half), Vec2::ZERO).to_world(center, 0.0)
    }

    #[test]
    fn test_polygon_validation() {
        assert!(ConvexPolygon::new(vec![Vec2::ZERO, Vec2::X]).is_err());
        assert!(ConvexPolygon::new(vec![Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)]).is_err());
        // Arrow head (concave)
        let concave = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 4.0),
        ];
        assert!(ConvexPolygon::new(concave).is_err());

        let tri = ConvexPolygon::new(vec![Vec2::ZERO, Vec2::new(0.0, 2.0), Vec2::new(2.0, 0.0)]).unwrap();
        assert!(signed_area(tri.points()) > 0.0);
    }

    #[test]
    fn test_edge_normals_point_outward() {
        let sq = square(Vec2::new(10.0, 10.0), 1.0);
        for i in 0..4 {
            let n = edge_normal(&sq, i);
            assert!((n.length() - 1.0).abs() < 1e-5);
            let mid = (sq[i] + sq[(i + 1) % 4]) * 0.5;
            assert!(n.dot(mid - Vec2::new(10.0, 10.0)) > 0.0);
        }
    }

    #[test]
    fn test_separate_disjoint() {
        let a = square(Vec2::ZERO, 1.0);
        let b = square(Vec2::new(3.0, 0.0), 1.0);
        assert!(separate(&a, &b).is_none());
    }

    #[test]
    fn test_separate_min_axis_toward_second() {
        let a = square(Vec2::ZERO, 1.0);
        let b = square(Vec2::new(1.5, 0.2), 1.0);
        let sep = separate(&a, &b).unwrap();
        assert!((sep.normal - Vec2::X).length() < 1e-5);
        assert!((sep.depth - 0.5).abs() < 1e-5);

        let sep = separate(&b, &a).unwrap();
        assert!((sep.normal - Vec2::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_separate_tie_keeps_first_axis() {
        let a = square(Vec2::ZERO, 1.0);
        let b = square(Vec2::new(1.5, 1.5), 1.0);
        let first = separate(&a, &b).unwrap();
        let again = separate(&a, &b).unwrap();
        assert_eq!(first, again);
        // Equal depth on x and y: the axis of the first edge of `a` wins,
        // oriented toward `b`
        assert!((first.depth - 0.5).abs() < 1e-5);
        let axis = edge_normal(&a, 0);
        let expected = if axis.dot(Vec2::ONE) > 0.0 { axis } else { -axis };
        assert!((first.normal - expected).length() < 1e-5);
    }

    #[test]
    fn test_separate_triangle_on_box() {
        let floor = square(Vec2::new(0.0, 10.0), 10.0);
        let tri = ConvexPolygon::new(vec![
            Vec2::new(-2.0, -2.0),
            Vec2::new(2.0, -2.0),
            Vec2::new(0.0, 1.0),
        ])
        .unwrap()
        .to_world(Vec2::new(0.0, -0.5), 0.0);
        // Triangle tip pokes 0.5 into the floor top at y = 0
        let sep = separate(&tri, &floor).unwrap();
        assert!((sep.normal - Vec2::Y).length() < 1e-5);
        assert!((sep.depth - 0.5).abs() < 1e-5);

        let pts = contact_points(&tri, &floor, sep.normal);
        assert_eq!(pts.len(), 1);
        assert!((pts[0].0 - Vec2::new(0.0, 0.5)).length() < 1e-4);
    }

    #[test]
    fn test_contact_points_face_to_face() {
        let a = square(Vec2::ZERO, 1.0);
        let b = square(Vec2::new(0.5, 1.8), 1.0);
        let sep = separate(&a, &b).unwrap();
        assert!((sep.normal - Vec2::Y).length() < 1e-5);

        let pts = contact_points(&a, &b, sep.normal);
        assert_eq!(pts.len(), 2);
        for (p, _) in &pts {
            assert!(p.x >= -0.5 - 1e-4 && p.x <= 1.0 + 1e-4);
        }
        // Ordered by feature id and stable between calls
        let again = contact_points(&a, &b, sep.normal);
        assert_eq!(pts, again);
    }

    #[test]
    fn test_ray_cast_polygon() {
        let sq = square(Vec2::new(5.0, 0.0), 1.0);
        let ray = Ray::new(Vec2::ZERO, Vec2::X);
        let (t, n) = ray_cast(&sq, &ray, 100.0).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!((n - Vec2::NEG_X).length() < 1e-5);
        assert!(ray_cast(&sq, &ray, 3.0).is_none());
    }
}
