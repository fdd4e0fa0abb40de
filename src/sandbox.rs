//! Canned scenes
//!
//! Small, reproducible worlds that exercise the pipeline the way a
//! platformer level would: tile floors with seams, uneven ground and a
//! random crowd for the broad phase.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;
use crate::error::CollisionError;
use crate::sim::{Body, BodyBuilder, BodyId, CollisionType, World};

/// Edge length of a floor tile
pub const TILE_SIZE: f32 = 16.0;
/// Top edge of every floor in the sandbox
pub const FLOOR_Y: f32 = 300.0;

/// Bodies in the scatter scene, not counting floor and player
const SCATTER_COUNT: usize = 48;

/// Which scene to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// A player resting across a row of equal tiles
    #[default]
    SeamStrip,
    /// A large box dropped onto two large walls
    StackedWalls,
    /// A small box sliding over alternating tall and short tiles
    MixedFloor,
    /// Random boxes raining onto a floor
    Scatter,
}

/// A built world and the body the caller cares about
#[derive(Debug, Clone)]
pub struct Scene {
    pub world: World,
    pub player: BodyId,
}

impl Scene {
    pub fn build(scenario: Scenario, config: PhysicsConfig, seed: u64) -> Result<Self, CollisionError> {
        log::info!("building {scenario:?} scene");
        match scenario {
            Scenario::SeamStrip => seam_strip(config),
            Scenario::StackedWalls => stacked_walls(config),
            Scenario::MixedFloor => mixed_floor(config),
            Scenario::Scatter => scatter(config, seed),
        }
    }
}

fn fixed_box(center: Vec2, size: Vec2) -> BodyBuilder {
    Body::builder()
        .pos(center.x, center.y)
        .rect(size.x, size.y)
        .collision_type(CollisionType::Fixed)
}

/// 32 tiles centred on multiples of [`TILE_SIZE`], with a 40 unit wide
/// player whose bottom edge sits on the tile tops.
pub fn seam_strip(config: PhysicsConfig) -> Result<Scene, CollisionError> {
    let mut world = World::new(config);
    for i in 0..32 {
        let center = Vec2::new(i as f32 * TILE_SIZE, FLOOR_Y + TILE_SIZE * 0.5);
        world.add_body(fixed_box(center, Vec2::splat(TILE_SIZE)))?;
    }
    let player = world.add_body(Body::builder().pos(100.0, FLOOR_Y - 20.0).rect(40.0, 40.0))?;
    Ok(Scene { world, player })
}

/// Two 100 unit walls side by side with a 100 unit box just above the seam
pub fn stacked_walls(config: PhysicsConfig) -> Result<Scene, CollisionError> {
    let mut world = World::new(config);
    world.add_body(fixed_box(Vec2::new(0.0, FLOOR_Y + 50.0), Vec2::splat(100.0)))?;
    world.add_body(fixed_box(Vec2::new(100.0, FLOOR_Y + 50.0), Vec2::splat(100.0)))?;
    let player = world.add_body(Body::builder().pos(50.0, FLOOR_Y - 51.0).rect(100.0, 100.0))?;
    Ok(Scene { world, player })
}

/// Tiles anchored by their top-left corner, alternating 200x900 and
/// 16x16, and a 16 unit box moving right at 164 units per second.
pub fn mixed_floor(config: PhysicsConfig) -> Result<Scene, CollisionError> {
    let mut world = World::new(config);
    let mut left = 0.0;
    for i in 0..6 {
        let size = if i % 2 == 0 {
            Vec2::new(200.0, 900.0)
        } else {
            Vec2::splat(TILE_SIZE)
        };
        let top_left = Vec2::new(left, FLOOR_Y);
        world.add_body(fixed_box(top_left + size * 0.5, size))?;
        left += size.x;
    }
    let player = world.add_body(
        Body::builder()
            .pos(100.0, FLOOR_Y - 30.0)
            .vel(164.0, 0.0)
            .rect(TILE_SIZE, TILE_SIZE),
    )?;
    Ok(Scene { world, player })
}

/// A floor plus [`SCATTER_COUNT`] seeded random boxes; a quarter are fixed
pub fn scatter(config: PhysicsConfig, seed: u64) -> Result<Scene, CollisionError> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut world = World::new(config);
    world.add_body(fixed_box(Vec2::new(400.0, FLOOR_Y + 400.0), Vec2::new(800.0, 32.0)))?;
    let player = world.add_body(Body::builder().pos(400.0, 0.0).rect(24.0, 24.0))?;

    for _ in 0..SCATTER_COUNT {
        let pos = Vec2::new(rng.random_range(0.0..800.0), rng.random_range(0.0..FLOOR_Y + 350.0));
        let size = Vec2::new(rng.random_range(8.0..40.0), rng.random_range(8.0..40.0));
        let builder = if rng.random_bool(0.25) {
            fixed_box(pos, size)
        } else {
            Body::builder()
                .pos(pos.x, pos.y)
                .vel(rng.random_range(-100.0..100.0), rng.random_range(-100.0..100.0))
                .mass(rng.random_range(1.0..20.0))
                .rect(size.x, size.y)
        };
        world.add_body(builder)?;
    }
    Ok(Scene { world, player })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_scenario_builds() {
        for scenario in [
            Scenario::SeamStrip,
            Scenario::StackedWalls,
            Scenario::MixedFloor,
            Scenario::Scatter,
        ] {
            let scene = Scene::build(scenario, PhysicsConfig::default(), 7).unwrap();
            assert!(scene.world.body(scene.player).is_some());
            assert!(scene.world.resolver().contains(scene.player));
        }
    }

    #[test]
    fn test_mixed_floor_layout() {
        let scene = mixed_floor(PhysicsConfig::default()).unwrap();
        let tile1 = scene.world.body(BodyId(1)).unwrap().bounds();
        assert_eq!(tile1.min, Vec2::new(200.0, 300.0));
        assert_eq!(tile1.max, Vec2::new(216.0, 316.0));
        assert_eq!(scene.player, BodyId(6));
    }

    #[test]
    fn test_scatter_is_seeded() {
        let a = scatter(PhysicsConfig::default(), 42).unwrap();
        let b = scatter(PhysicsConfig::default(), 42).unwrap();
        let c = scatter(PhysicsConfig::default(), 43).unwrap();
        let positions = |s: &Scene| s.world.bodies().iter().map(|b| b.pos()).collect::<Vec<_>>();
        assert_eq!(positions(&a), positions(&b));
        assert_ne!(positions(&a), positions(&c));
    }
}
