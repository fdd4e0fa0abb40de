//! Rays for tree and shape casting

use glam::Vec2;

use super::body::BodyId;

/// A half-line starting at `pos` heading along the unit vector `dir`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub pos: Vec2,
    pub dir: Vec2,
}

impl Ray {
    /// Create a ray; `dir` is normalized (a zero direction stays zero and
    /// hits nothing but boxes containing the origin)
    pub fn new(pos: Vec2, dir: Vec2) -> Self {
        Self {
            pos,
            dir: dir.normalize_or_zero(),
        }
    }

    /// Point at distance `t` along the ray
    #[inline]
    pub fn at(&self, t: f32) -> Vec2 {
        self.pos + self.dir * t
    }

    /// Intersect with the segment `a`-`b`, returning the distance along the ray
    pub fn intersect_segment(&self, a: Vec2, b: Vec2) -> Option<f32> {
        let edge = b - a;
        let denom = self.dir.perp_dot(edge);
        if denom.abs() < f32::EPSILON {
            return None; // Parallel
        }
        let to_start = a - self.pos;
        let t = to_start.perp_dot(edge) / denom;
        let u = to_start.perp_dot(self.dir) / denom;
        if t >= 0.0 && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }
}

/// The result of a successful ray cast against the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    /// Body that was hit
    pub body: BodyId,
    /// World-space hit location
    pub point: Vec2,
    /// Surface normal at the hit, facing back toward the ray origin
    pub normal: Vec2,
    /// Distance travelled along the ray
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_intersection() {
        let ray = Ray::new(Vec2::ZERO, Vec2::new(2.0, 0.0));
        assert_eq!(ray.dir, Vec2::X);

        let t = ray
            .intersect_segment(Vec2::new(5.0, -1.0), Vec2::new(5.0, 1.0))
            .unwrap();
        assert!((t - 5.0).abs() < 1e-5);
        assert!((ray.at(t) - Vec2::new(5.0, 0.0)).length() < 1e-5);

        // Behind the origin
        assert!(ray
            .intersect_segment(Vec2::new(-5.0, -1.0), Vec2::new(-5.0, 1.0))
            .is_none());
        // Parallel
        assert!(ray
            .intersect_segment(Vec2::new(0.0, 1.0), Vec2::new(5.0, 1.0))
            .is_none());
    }
}
