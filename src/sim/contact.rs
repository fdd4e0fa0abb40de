//! Contacts produced by the narrow phase and consumed by the solver

use glam::Vec2;

use super::body::BodyId;
use super::pair::PairId;
use super::polygon::FeatureId;
use super::side::Side;
use crate::error::CollisionError;

/// Identity of a contact: the body pair plus the colliding sub-shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId {
    pub pair: PairId,
    pub shape_a: u16,
    pub shape_b: u16,
}

/// A single point of contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World position
    pub point: Vec2,
    /// Position relative to body A
    pub local: Vec2,
    pub id: FeatureId,
}

/// Two overlapping sub-shapes and how to push them apart.
///
/// `normal` and `mtv` point from body A toward body B. Resolving the
/// contact moves A by `-mtv` and B by `+mtv` (or a share of it).
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionContact {
    pub id: ContactId,
    pub a: BodyId,
    pub b: BodyId,
    pub mtv: Vec2,
    pub normal: Vec2,
    pub tangent: Vec2,
    pub points: Vec<ContactPoint>,
    /// Penetration depth along `normal` when the contact was generated
    pub separation: f32,
    canceled: bool,
}

impl CollisionContact {
    /// Build a contact. The normal is normalized; a zero-length or non-finite
    /// normal is an error.
    pub fn new(
        a: BodyId,
        b: BodyId,
        shapes: (usize, usize),
        mtv: Vec2,
        normal: Vec2,
        points: Vec<ContactPoint>,
    ) -> Result<Self, CollisionError> {
        let Some(normal) = normal.try_normalize() else {
            return Err(CollisionError::DegenerateNormal { a, b });
        };
        Ok(Self {
            id: ContactId {
                pair: PairId::new(a, b),
                shape_a: shapes.0 as u16,
                shape_b: shapes.1 as u16,
            },
            a,
            b,
            mtv,
            normal,
            tangent: normal.perp(),
            points,
            separation: mtv.dot(normal),
            canceled: false,
        })
    }

    pub fn pair_id(&self) -> PairId {
        self.id.pair
    }

    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    pub fn involves(&self, id: BodyId) -> bool {
        self.a == id || self.b == id
    }

    /// Side of body A the contact is on
    pub fn side(&self) -> Side {
        Side::from_direction(self.mtv)
    }

    /// Side of `body` the contact is on, `Side::None` for an unrelated body
    pub fn side_for(&self, body: BodyId) -> Side {
        if body == self.a {
            self.side()
        } else if body == self.b {
            self.side().opposite()
        } else {
            Side::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_contact() {
        let c = CollisionContact::new(BodyId(4), BodyId(2), (1, 0), Vec2::new(0.0, 3.0), Vec2::new(0.0, 2.0), vec![])
            .unwrap();
        assert_eq!(c.normal, Vec2::Y);
        assert_eq!(c.tangent, Vec2::new(-1.0, 0.0));
        assert_eq!(c.separation, 3.0);
        assert_eq!(c.pair_id(), PairId::new(BodyId(2), BodyId(4)));
        assert_eq!(c.side_for(BodyId(4)), Side::Bottom);
        assert_eq!(c.side_for(BodyId(2)), Side::Top);
        assert_eq!(c.side_for(BodyId(9)), Side::None);
        assert!(!c.is_canceled());
    }

    #[test]
    fn test_degenerate_normal() {
        let err = CollisionContact::new(BodyId(0), BodyId(1), (0, 0), Vec2::ZERO, Vec2::ZERO, vec![]);
        assert_eq!(err, Err(CollisionError::DegenerateNormal { a: BodyId(0), b: BodyId(1) }));
        let err = CollisionContact::new(BodyId(0), BodyId(1), (0, 0), Vec2::ZERO, Vec2::new(f32::NAN, 1.0), vec![]);
        assert!(err.is_err());
    }
}
