//! Broad phase pairs and their expansion into contacts

use std::fmt;

use serde::{Deserialize, Serialize};

use super::body::{Body, BodyId, BodySet, CollisionType};
use super::collision::collide_shapes;
use super::contact::{CollisionContact, ContactPoint};
use crate::error::CollisionError;

/// Order-independent identity of two bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairId {
    pub low: BodyId,
    pub high: BodyId,
}

impl PairId {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.low, self.high)
    }
}

/// Two bodies the broad phase considers close enough to test.
///
/// `a` and `b` keep the order they were created with (contacts point from
/// `a` toward `b`); equality only looks at the unordered id.
#[derive(Debug, Clone, Copy)]
pub struct Pair {
    pub id: PairId,
    pub a: BodyId,
    pub b: BodyId,
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Pair {}

impl std::hash::Hash for Pair {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Pair {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        Self {
            id: PairId::new(a, b),
            a,
            b,
        }
    }

    /// Whether two bodies may produce contacts at all
    pub fn can_collide(a: &Body, b: &Body) -> bool {
        if a.id() == b.id() {
            return false;
        }
        if !a.is_active() || !b.is_active() {
            return false;
        }
        let (ta, tb) = (a.collision_type(), b.collision_type());
        if ta == CollisionType::PreventCollision || tb == CollisionType::PreventCollision {
            return false;
        }
        if ta == CollisionType::Fixed && tb == CollisionType::Fixed {
            return false;
        }
        a.group().can_collide(&b.group())
    }

    /// Narrow phase for every overlapping sub-shape pair, in sub-shape order
    pub fn collide(&self, bodies: &BodySet) -> Result<Vec<CollisionContact>, CollisionError> {
        let a = bodies.get(self.a).ok_or(CollisionError::UnknownBody(self.a))?;
        let b = bodies.get(self.b).ok_or(CollisionError::UnknownBody(self.b))?;

        let mut contacts = Vec::new();
        for (i, shape_a) in a.world_shapes().iter().enumerate() {
            for (j, shape_b) in b.world_shapes().iter().enumerate() {
                if !shape_a.bounds().overlaps(&shape_b.bounds()) {
                    continue;
                }
                let Some(manifold) = collide_shapes(shape_a, shape_b) else {
                    continue;
                };
                let points = manifold
                    .points
                    .into_iter()
                    .map(|(point, id)| ContactPoint {
                        point,
                        local: point - a.pos(),
                        id,
                    })
                    .collect();
                contacts.push(CollisionContact::new(
                    self.a,
                    self.b,
                    (i, j),
                    manifold.mtv,
                    manifold.normal,
                    points,
                )?);
            }
        }
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::CollisionGroup;
    use crate::sim::shape::Shape;
    use glam::Vec2;
    use std::collections::HashSet;

    fn body(id: u32, x: f32, y: f32, kind: CollisionType) -> Body {
        Body::builder()
            .pos(x, y)
            .rect(10.0, 10.0)
            .collision_type(kind)
            .build(BodyId(id))
            .unwrap()
    }

    #[test]
    fn test_pair_identity_ignores_order() {
        let mut set = HashSet::new();
        set.insert(Pair::new(BodyId(1), BodyId(2)));
        assert!(!set.insert(Pair::new(BodyId(2), BodyId(1))));
        assert_eq!(PairId::new(BodyId(5), BodyId(3)).low, BodyId(3));
    }

    #[test]
    fn test_can_collide_rules() {
        let active = body(0, 0.0, 0.0, CollisionType::Active);
        let fixed = body(1, 0.0, 0.0, CollisionType::Fixed);
        let fixed2 = body(2, 0.0, 0.0, CollisionType::Fixed);
        let ghost = body(3, 0.0, 0.0, CollisionType::PreventCollision);
        let passive = body(4, 0.0, 0.0, CollisionType::Passive);

        assert!(Pair::can_collide(&active, &fixed));
        assert!(Pair::can_collide(&passive, &fixed));
        assert!(!Pair::can_collide(&active, &active));
        assert!(!Pair::can_collide(&fixed, &fixed2));
        assert!(!Pair::can_collide(&active, &ghost));

        let mut sleeping = active.clone();
        sleeping.set_active(false);
        assert!(!Pair::can_collide(&sleeping, &fixed));

        let loner = Body::builder()
            .rect(1.0, 1.0)
            .group(CollisionGroup::new(0b10, 0b10))
            .build(BodyId(9))
            .unwrap();
        let other = Body::builder()
            .rect(1.0, 1.0)
            .group(CollisionGroup::new(0b01, 0b01))
            .build(BodyId(8))
            .unwrap();
        assert!(!Pair::can_collide(&loner, &other));
    }

    #[test]
    fn test_collide_two_walls() {
        let bodies: BodySet = [
            Body::builder().pos(50.0, 99.0).rect(100.0, 100.0).build(BodyId(0)).unwrap(),
            Body::builder()
                .pos(0.0, 0.0)
                .rect(100.0, 100.0)
                .collision_type(CollisionType::Fixed)
                .build(BodyId(1))
                .unwrap(),
        ]
        .into_iter()
        .collect();

        let contacts = Pair::new(BodyId(0), BodyId(1)).collide(&bodies).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].mtv, Vec2::new(0.0, -1.0));
        assert_eq!(contacts[0].points[0].local, Vec2::new(0.0, -49.0));

        // Reversed pair flips the direction
        let contacts = Pair::new(BodyId(1), BodyId(0)).collide(&bodies).unwrap();
        assert_eq!(contacts[0].mtv, Vec2::new(0.0, 1.0));

        assert_eq!(
            Pair::new(BodyId(0), BodyId(7)).collide(&bodies),
            Err(CollisionError::UnknownBody(BodyId(7)))
        );
    }

    #[test]
    fn test_composite_produces_one_contact_per_sub_shape() {
        let comb = Body::builder()
            .shape(Shape::rect_at(10.0, 10.0, Vec2::new(-10.0, 0.0)))
            .shape(Shape::rect_at(10.0, 10.0, Vec2::new(10.0, 0.0)))
            .shape(Shape::rect_at(10.0, 10.0, Vec2::new(0.0, -40.0)))
            .build(BodyId(0))
            .unwrap();
        let floor = Body::builder()
            .pos(0.0, 9.0)
            .rect(100.0, 10.0)
            .collision_type(CollisionType::Fixed)
            .build(BodyId(1))
            .unwrap();
        let bodies: BodySet = [comb, floor].into_iter().collect();
        let contacts = Pair::new(BodyId(0), BodyId(1)).collide(&bodies).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!((contacts[0].id.shape_a, contacts[1].id.shape_a), (0, 1));
        assert!(contacts.iter().all(|c| c.mtv == Vec2::new(0.0, 1.0)));
    }
}
