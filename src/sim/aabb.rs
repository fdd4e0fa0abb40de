//! Axis-aligned bounding boxes
//!
//! Screen convention: `min.y` is the top edge, `max.y` the bottom edge.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ray::Ray;

/// An axis-aligned box given by its min and max corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec2::ZERO, Vec2::ZERO)
    }
}

impl Aabb {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box covering the whole float range
    pub const fn everything() -> Self {
        Self::new(Vec2::splat(f32::MIN), Vec2::splat(f32::MAX))
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Smallest box containing every point (empty input gives a zero box)
    pub fn from_points(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        points
            .iter()
            .skip(1)
            .fold(Self::new(*first, *first), |bb, p| Self::new(bb.min.min(*p), bb.max.max(*p)))
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Perimeter, used as the insertion cost metric of the dynamic tree
    #[inline]
    pub fn perimeter(&self) -> f32 {
        2.0 * (self.width() + self.height())
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Union of both boxes
    #[inline]
    pub fn combine(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// True if `other` lies entirely inside this box (edges may touch)
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    /// Inclusive overlap test: touching faces count as overlapping
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Strict overlap test: both axes must overlap by more than `epsilon`
    pub fn overlaps_by(&self, other: &Aabb, epsilon: f32) -> bool {
        let total = self.combine(other);
        total.width() + epsilon < self.width() + other.width()
            && total.height() + epsilon < self.height() + other.height()
    }

    /// The overlapping region, if the boxes overlap with positive area
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min.x < max.x && min.y < max.y {
            Some(Aabb::new(min, max))
        } else {
            None
        }
    }

    /// Grow the box by `margin` on every side
    pub fn expand(&self, margin: f32) -> Aabb {
        Aabb::new(self.min - Vec2::splat(margin), self.max + Vec2::splat(margin))
    }

    /// Stretch the box in the direction of `displacement` only
    pub fn sweep(&self, displacement: Vec2) -> Aabb {
        let mut out = *self;
        if displacement.x < 0.0 {
            out.min.x += displacement.x;
        } else {
            out.max.x += displacement.x;
        }
        if displacement.y < 0.0 {
            out.min.y += displacement.y;
        } else {
            out.max.y += displacement.y;
        }
        out
    }

    pub fn translate(&self, offset: Vec2) -> Aabb {
        Aabb::new(self.min + offset, self.max + offset)
    }

    /// Corners in clockwise screen order starting at the top-left
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Minimum translation vector from this box toward `other`.
    ///
    /// Returns `None` unless both axes overlap by a positive amount. The
    /// result points from this box's center toward `other` along the axis
    /// needing the smaller push; its length is how far this box must move
    /// against it to separate. On a tie the x axis wins.
    pub fn collide(&self, other: &Aabb) -> Option<Vec2> {
        let overlap_x = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
        let overlap_y = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        if overlap_x <= 0.0 || overlap_y <= 0.0 {
            return None;
        }

        let delta = other.center() - self.center();
        let depth_x = if delta.x >= 0.0 {
            self.max.x - other.min.x
        } else {
            other.max.x - self.min.x
        };
        let depth_y = if delta.y >= 0.0 {
            self.max.y - other.min.y
        } else {
            other.max.y - self.min.y
        };

        let sx = if delta.x < 0.0 { -1.0 } else { 1.0 };
        let sy = if delta.y < 0.0 { -1.0 } else { 1.0 };
        if depth_x <= depth_y {
            Some(Vec2::new(sx * depth_x, 0.0))
        } else {
            Some(Vec2::new(0.0, sy * depth_y))
        }
    }

    /// Slab test. Returns the distance along the ray at which it enters the
    /// box (0 if the origin is inside), or `None` if it misses within
    /// `max_distance`.
    pub fn ray_cast(&self, ray: &Ray, max_distance: f32) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;

        for axis in 0..2 {
            let origin = ray.pos[axis];
            let dir = ray.dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if dir.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}
