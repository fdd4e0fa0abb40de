//! Fixed timestep simulation tick
//!
//! Integrates motion, then runs the collision pipeline: broad phase
//! update, pair evaluation, narrow phase and the arcade solver.

use super::body::CollisionType;
use super::contact::CollisionContact;
use super::solver::ContactOutcome;
use super::state::World;
use crate::consts::*;

/// What happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Tree leaves that had to be re-fitted
    pub moved: usize,
    /// Candidate pairs from the broad phase
    pub pairs: usize,
    /// Every narrow-phase contact, canceled ones included
    pub contacts: Vec<CollisionContact>,
    pub outcomes: Vec<ContactOutcome>,
}

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, dt: f32) -> TickReport {
    // Semi-implicit Euler
    let gravity = world.config.gravity;
    for body in world.bodies.iter_mut() {
        if !body.is_active() || body.collision_type() != CollisionType::Active {
            continue;
        }
        let vel = body.vel() + gravity * dt;
        body.set_vel(vel);
        body.translate(vel * dt);
    }

    let moved = world.resolver.update(&world.bodies);
    let pairs = world.resolver.evaluate(&world.bodies);

    let mut contacts = Vec::new();
    for pair in &pairs {
        match pair.collide(&world.bodies) {
            Ok(found) => contacts.extend(found),
            Err(err) => log::error!("skipping pair {}: {err}", pair.id),
        }
    }

    let report = world.solver.solve(contacts, &mut world.bodies);
    world.time_ticks += 1;

    TickReport {
        moved,
        pairs: pairs.len(),
        contacts: report.contacts,
        outcomes: report.outcomes,
    }
}

/// Run as many fixed ticks as fit into `frame_dt` plus the carried
/// `accumulator`, capped at [`MAX_SUBSTEPS`]
pub fn run_frame(world: &mut World, frame_dt: f32, accumulator: &mut f32) -> Vec<TickReport> {
    *accumulator += frame_dt;
    let mut reports = Vec::new();
    while *accumulator >= SIM_DT && reports.len() < MAX_SUBSTEPS as usize {
        reports.push(tick(world, SIM_DT));
        *accumulator -= SIM_DT;
    }
    if *accumulator >= SIM_DT {
        log::warn!("dropping {:.3}s of simulation time", *accumulator);
        *accumulator = 0.0;
    }
    reports
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::config::{BroadPhaseStrategy, ContactSolveBias, PhysicsConfig};
    use crate::sandbox::{self, FLOOR_Y};
    use crate::sim::Side;

    fn config(gravity: f32, bias: ContactSolveBias) -> PhysicsConfig {
        let mut config = PhysicsConfig::default();
        config.gravity = Vec2::new(0.0, gravity);
        config.arcade.contact_solve_bias = bias;
        config
    }

    #[test]
    fn test_tick_integrates_active_bodies_only() {
        let mut scene = sandbox::stacked_walls(config(600.0, ContactSolveBias::None)).unwrap();
        let report = tick(&mut scene.world, SIM_DT);
        let player = scene.world.body(scene.player).unwrap();
        assert!((player.vel().y - 10.0).abs() < 1e-4);
        assert!(player.pos().y > FLOOR_Y - 51.0);
        // Still one unit above the walls
        assert!(report.contacts.is_empty());
        let wall = scene.world.body(crate::sim::BodyId(0)).unwrap();
        assert_eq!(wall.pos(), Vec2::new(0.0, FLOOR_Y + 50.0));
        assert_eq!(scene.world.time_ticks(), 1);
    }

    #[test]
    fn test_tick_no_seam_snag() {
        for strategy in [
            BroadPhaseStrategy::Naive,
            BroadPhaseStrategy::DynamicTree,
            BroadPhaseStrategy::SparseHashGrid,
        ] {
            let mut config = config(800.0, ContactSolveBias::None);
            config.broad_phase = strategy;
            let mut scene = sandbox::seam_strip(config).unwrap();

            let mut sides = Vec::new();
            for _ in 0..60 {
                let report = tick(&mut scene.world, SIM_DT);
                sides.extend(report.outcomes.iter().filter_map(|o| o.side_for(scene.player)));
            }
            assert!(!sides.is_empty());
            assert!(sides.iter().all(|s| *s == Side::Bottom), "{strategy:?}: {sides:?}");

            let player = scene.world.body(scene.player).unwrap();
            assert!((player.bounds().max.y - FLOOR_Y).abs() < 1e-3);
            assert_eq!(player.vel().y, 0.0);
            assert_eq!(player.pos().x, 100.0);
        }
    }

    #[test]
    fn test_tick_vertical_first_lands_on_mixed_floor() {
        let mut scene = sandbox::mixed_floor(config(5000.0, ContactSolveBias::VerticalFirst)).unwrap();
        let mut sides = Vec::new();
        for _ in 0..40 {
            let report = tick(&mut scene.world, SIM_DT);
            sides.extend(report.outcomes.iter().filter_map(|o| o.side_for(scene.player)));
        }
        assert!(!sides.is_empty());
        assert!(sides.iter().all(|s| *s == Side::Bottom), "{sides:?}");

        // Never stopped by the short tiles
        let player = scene.world.body(scene.player).unwrap();
        assert_eq!(player.vel().x, 164.0);
        assert!(player.pos().x > 200.0);
    }

    #[test]
    fn test_determinism() {
        let run = |seed| {
            let mut scene = sandbox::scatter(config(400.0, ContactSolveBias::VerticalFirst), seed).unwrap();
            let mut contacts = 0;
            for _ in 0..120 {
                contacts += tick(&mut scene.world, SIM_DT).contacts.len();
            }
            let positions: Vec<Vec2> = scene.world.bodies().iter().map(|b| b.pos()).collect();
            (positions, contacts)
        };
        assert_eq!(run(12345), run(12345));
    }

    #[test]
    fn test_run_frame_caps_substeps() {
        let mut scene = sandbox::stacked_walls(PhysicsConfig::default()).unwrap();
        let mut accumulator = 0.0;

        let reports = run_frame(&mut scene.world, SIM_DT * 2.5, &mut accumulator);
        assert_eq!(reports.len(), 2);
        assert!(accumulator > 0.0 && accumulator < SIM_DT);

        let reports = run_frame(&mut scene.world, 1.0, &mut accumulator);
        assert_eq!(reports.len(), MAX_SUBSTEPS as usize);
        assert_eq!(accumulator, 0.0);
        assert_eq!(scene.world.time_ticks(), 2 + MAX_SUBSTEPS as u64);
    }
}
