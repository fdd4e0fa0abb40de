//! Scene state
//!
//! A [`World`] owns every body plus the broad phase and solver that act on
//! them. Bodies enter and leave only through the world so the resolver
//! never drifts out of sync with the body set.

use glam::Vec2;

use super::aabb::Aabb;
use super::body::{Body, BodyBuilder, BodyId, BodySet};
use super::contact::CollisionContact;
use super::ray::{Ray, RayCastHit};
use super::resolver::CollisionResolver;
use super::solver::ArcadeSolver;
use crate::config::PhysicsConfig;
use crate::debug::DebugLines;
use crate::error::CollisionError;

/// Complete collision scene
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) config: PhysicsConfig,
    pub(crate) bodies: BodySet,
    pub(crate) resolver: CollisionResolver,
    pub(crate) solver: ArcadeSolver,
    /// Ticks completed since creation
    pub(crate) time_ticks: u64,
    /// Id for the next added body. Ids are never reused.
    next_id: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl World {
    pub fn new(config: PhysicsConfig) -> Self {
        let resolver = CollisionResolver::new(&config);
        let solver = ArcadeSolver::new(&config.arcade, config.colliders.composite_strategy);
        log::debug!(
            "world created: broad phase {}, bias {}",
            config.broad_phase.as_str(),
            config.arcade.contact_solve_bias
        );
        Self {
            config,
            bodies: BodySet::new(),
            resolver,
            solver,
            time_ticks: 0,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    pub fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    pub fn solver(&self) -> &ArcadeSolver {
        &self.solver
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    /// Mutable access for gameplay code (teleports, velocity changes).
    /// The broad phase picks up the new position on the next tick.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    /// Build a body with a fresh id and start tracking it
    pub fn add_body(&mut self, builder: BodyBuilder) -> Result<BodyId, CollisionError> {
        let body = builder.build(BodyId(self.next_id))?;
        self.resolver.register(&body)?;
        let id = self.bodies.insert(body)?;
        self.next_id += 1;
        Ok(id)
    }

    /// Stop tracking a body and hand it back. Contacts it had with other
    /// bodies are reported as ended on the next tick.
    pub fn remove_body(&mut self, id: BodyId) -> Result<Body, CollisionError> {
        let body = self.bodies.remove(id)?;
        // A body that left the world bounds is already untracked
        if self.resolver.contains(id) {
            self.resolver.unregister(id)?;
        }
        Ok(body)
    }

    pub fn query(&self, bounds: &Aabb) -> Vec<BodyId> {
        self.resolver.query(bounds, &self.bodies)
    }

    pub fn query_point(&self, point: Vec2) -> Vec<BodyId> {
        self.resolver.query_point(point, &self.bodies)
    }

    pub fn ray_cast(&self, ray: &Ray, max_distance: f32) -> Option<RayCastHit> {
        self.resolver.ray_cast(ray, max_distance, &self.bodies)
    }

    /// Bodies, broad phase nodes and the given contacts as line segments
    pub fn debug_draw(&self, contacts: &[CollisionContact], lines: &mut DebugLines) {
        lines.draw_bodies(&self.bodies);
        self.resolver.debug_draw(&self.bodies, lines);
        lines.draw_contacts(contacts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BroadPhaseStrategy;
    use crate::consts::SIM_DT;
    use crate::sim::body::CollisionType;
    use crate::sim::solver::ContactOutcome;
    use crate::sim::tick::tick;

    const STRATEGIES: [BroadPhaseStrategy; 3] = [
        BroadPhaseStrategy::Naive,
        BroadPhaseStrategy::DynamicTree,
        BroadPhaseStrategy::SparseHashGrid,
    ];

    fn world(strategy: BroadPhaseStrategy) -> World {
        let mut config = PhysicsConfig::default();
        config.broad_phase = strategy;
        World::new(config)
    }

    #[test]
    fn test_add_and_remove_body() {
        for strategy in STRATEGIES {
            let mut world = world(strategy);
            let a = world.add_body(Body::builder().rect(10.0, 10.0)).unwrap();
            let b = world.add_body(Body::builder().pos(100.0, 0.0).rect(10.0, 10.0)).unwrap();
            assert_eq!((a, b), (BodyId(0), BodyId(1)));
            assert!(world.resolver().contains(b));

            let removed = world.remove_body(a).unwrap();
            assert_eq!(removed.id(), a);
            assert!(!world.resolver().contains(a));
            assert_eq!(world.remove_body(a).unwrap_err(), CollisionError::UnknownBody(a));

            // Ids keep growing after a removal
            let c = world.add_body(Body::builder().rect(1.0, 1.0)).unwrap();
            assert_eq!(c, BodyId(2));
        }
    }

    #[test]
    fn test_invalid_builder_is_rejected() {
        let mut world = World::default();
        assert!(world.add_body(Body::builder()).is_err());
        assert!(world.bodies().is_empty());
    }

    #[test]
    fn test_queries_go_through_the_resolver() {
        let mut world = World::default();
        let wall = world
            .add_body(
                Body::builder()
                    .pos(50.0, 0.0)
                    .rect(10.0, 10.0)
                    .collision_type(CollisionType::Fixed),
            )
            .unwrap();
        assert_eq!(world.query_point(Vec2::new(52.0, 1.0)), vec![wall]);
        assert!(world.query(&Aabb::new(Vec2::splat(-5.0), Vec2::splat(5.0))).is_empty());

        let hit = world.ray_cast(&Ray::new(Vec2::ZERO, Vec2::X), 100.0).unwrap();
        assert_eq!(hit.body, wall);

        let mut lines = DebugLines::new();
        world.debug_draw(&[], &mut lines);
        assert!(lines.segment_count() >= 4);
    }

    #[test]
    fn test_highest_id_is_not_reused() {
        let mut world = World::default();
        world.add_body(Body::builder().rect(10.0, 10.0)).unwrap();
        let last = world.add_body(Body::builder().pos(50.0, 0.0).rect(10.0, 10.0)).unwrap();
        world.remove_body(last).unwrap();
        assert_eq!(world.add_body(Body::builder().rect(1.0, 1.0)).unwrap(), BodyId(2));

        // A rejected builder does not use up an id
        assert!(world.add_body(Body::builder()).is_err());
        assert_eq!(world.add_body(Body::builder().rect(1.0, 1.0)).unwrap(), BodyId(3));
    }

    #[test]
    fn test_removed_body_ends_its_contacts() {
        for strategy in STRATEGIES {
            let mut world = world(strategy);
            let floor = world
                .add_body(
                    Body::builder()
                        .rect(100.0, 10.0)
                        .collision_type(CollisionType::Fixed),
                )
                .unwrap();
            let crate_box = || Body::builder().pos(0.0, -9.0).rect(10.0, 10.0);
            let first = world.add_body(crate_box()).unwrap();

            let report = tick(&mut world, SIM_DT);
            assert_eq!(report.outcomes.len(), 1, "{strategy:?}");
            assert!(matches!(
                report.outcomes[0],
                ContactOutcome::Started { a, b, .. } if a == floor && b == first
            ));

            world.remove_body(first).unwrap();
            let second = world.add_body(crate_box()).unwrap();
            assert_eq!(second, BodyId(2));

            let report = tick(&mut world, SIM_DT);
            assert_eq!(report.outcomes.len(), 2, "{strategy:?}");
            assert!(matches!(
                report.outcomes[0],
                ContactOutcome::Started { a, b, .. } if a == floor && b == second
            ));
            assert_eq!(report.outcomes[1], ContactOutcome::Ended { a: floor, b: first });
        }
    }

    #[test]
    fn test_unknown_bias_warns_once() {
        let config = PhysicsConfig::from_json(r#"{ "arcade": { "contact_solve_bias": "diagonal" } }"#).unwrap();
        let mut world = World::new(config);
        world
            .add_body(
                Body::builder()
                    .rect(100.0, 10.0)
                    .collision_type(CollisionType::Fixed),
            )
            .unwrap();
        world.add_body(Body::builder().pos(0.0, -9.0).rect(10.0, 10.0)).unwrap();
        for _ in 0..3 {
            tick(&mut world, SIM_DT);
        }
        assert!(world.solver().diagnostics().has_warned("unrecognized-bias"));
        assert_eq!(world.solver().diagnostics().emitted(), 1);
    }
}
