//! Arcade Collision - 2D collision detection and arcade resolution
//!
//! Core modules:
//! - `sim`: Deterministic collision pipeline (broad phase, narrow phase, solver)
//! - `debug`: Read-only draw hooks producing line vertex buffers
//! - `config`: Data-driven physics configuration (JSON)
//! - `sandbox`: Canned scenes used by the binary and the tests

pub mod config;
pub mod debug;
pub mod diagnostics;
pub mod error;
pub mod sandbox;
pub mod sim;

pub use config::{
    ArcadeConfig, BroadPhaseStrategy, ColliderConfig, CompositeStrategy, ContactSolveBias, DynamicTreeConfig,
    PhysicsConfig, SparseHashGridConfig,
};
pub use diagnostics::Diagnostics;
pub use error::{CollisionError, ConfigError};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep used by the sandbox (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Overlap at or below this is treated as "not touching" by the solver
    pub const DEFAULT_OVERLAP_EPSILON: f32 = 0.0001;
    /// Minimum translation vectors shorter than this are ignored
    pub const DEFAULT_MTV_EPSILON: f32 = 0.0001;

    /// Fixed margin added around every tree leaf
    pub const DEFAULT_BOUNDS_PADDING: f32 = 5.0;
    /// Scales the velocity-based leaf margin
    pub const DEFAULT_VELOCITY_MULTIPLIER: f32 = 2.0;
    /// Cell edge length of the sparse hash grid broad phase
    pub const DEFAULT_GRID_CELL_SIZE: f32 = 100.0;
    /// How far ahead (seconds) a leaf margin anticipates motion
    pub const TREE_VELOCITY_LOOKAHEAD: f32 = 0.032;

    /// Two separating-axis depths closer than this are considered a tie
    pub const SAT_TIE_EPSILON: f32 = 1.0e-6;
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    if angle == 0.0 {
        return v;
    }
    Vec2::from_angle(angle).rotate(v)
}

/// Project a set of points onto an axis, returning `(min, max)`
#[inline]
pub fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}
