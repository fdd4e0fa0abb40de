//! Physics configuration
//!
//! Plain serde values. Every section defaults, so a config file only needs
//! the keys it changes.

use std::fmt;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BOUNDS_PADDING, DEFAULT_GRID_CELL_SIZE, DEFAULT_MTV_EPSILON, DEFAULT_OVERLAP_EPSILON,
    DEFAULT_VELOCITY_MULTIPLIER,
};
use crate::error::ConfigError;
use crate::sim::Aabb;

/// Which broad phase produces candidate pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BroadPhaseStrategy {
    /// Every body against every other body
    Naive,
    #[default]
    DynamicTree,
    /// Uniform grid of cells, only occupied cells are stored
    SparseHashGrid,
}

impl BroadPhaseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadPhaseStrategy::Naive => "naive",
            BroadPhaseStrategy::DynamicTree => "dynamic-tree",
            BroadPhaseStrategy::SparseHashGrid => "sparse-hash-grid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "naive" => Some(BroadPhaseStrategy::Naive),
            "dynamic-tree" | "tree" => Some(BroadPhaseStrategy::DynamicTree),
            "sparse-hash-grid" | "grid" => Some(BroadPhaseStrategy::SparseHashGrid),
            _ => None,
        }
    }
}

/// How a body with several sub-shapes reports contacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeStrategy {
    /// The sub-shapes act as one collider: one contact per body pair
    #[default]
    Together,
    /// Each colliding sub-shape pair keeps its own contact
    Separate,
}

/// Order in which simultaneous contacts are position-solved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ContactSolveBias {
    /// Pair discovery order
    #[default]
    None,
    /// Up/down contacts before left/right ones
    VerticalFirst,
    /// Left/right contacts before up/down ones
    HorizontalFirst,
    /// A name nobody knows; solved like `None`
    Unrecognized(String),
}

impl ContactSolveBias {
    pub fn as_str(&self) -> &str {
        match self {
            ContactSolveBias::None => "none",
            ContactSolveBias::VerticalFirst => "vertical-first",
            ContactSolveBias::HorizontalFirst => "horizontal-first",
            ContactSolveBias::Unrecognized(name) => name,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().replace('_', "-").as_str() {
            "none" | "" => ContactSolveBias::None,
            "vertical-first" | "verticalfirst" | "vertical" => ContactSolveBias::VerticalFirst,
            "horizontal-first" | "horizontalfirst" | "horizontal" => ContactSolveBias::HorizontalFirst,
            _ => ContactSolveBias::Unrecognized(s.to_string()),
        }
    }
}

impl From<String> for ContactSolveBias {
    fn from(s: String) -> Self {
        ContactSolveBias::parse(&s)
    }
}

impl From<ContactSolveBias> for String {
    fn from(bias: ContactSolveBias) -> Self {
        bias.as_str().to_string()
    }
}

impl fmt::Display for ContactSolveBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad phase tree tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicTreeConfig {
    /// Margin added on every side of a leaf box
    pub bounds_padding: f32,
    /// Scales how far a leaf is stretched along the body's velocity
    pub velocity_multiplier: f32,
    /// Bodies leaving this box stop being tracked. Every broad phase
    /// strategy honours it, not only the tree.
    pub world_bounds: Option<Aabb>,
}

impl Default for DynamicTreeConfig {
    fn default() -> Self {
        Self {
            bounds_padding: DEFAULT_BOUNDS_PADDING,
            velocity_multiplier: DEFAULT_VELOCITY_MULTIPLIER,
            world_bounds: None,
        }
    }
}

/// Broad phase grid tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseHashGridConfig {
    /// Edge length of one cell in world units
    pub size: f32,
}

impl Default for SparseHashGridConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_CELL_SIZE,
        }
    }
}

/// Arcade solver tolerances and ordering, read-only during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    pub contact_solve_bias: ContactSolveBias,
    /// Overlap (in world units) below which a contact is not corrected
    pub overlap_epsilon: f32,
    /// Per-axis mtv magnitude below which a contact is not corrected
    pub mtv_epsilon: f32,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            contact_solve_bias: ContactSolveBias::None,
            overlap_epsilon: DEFAULT_OVERLAP_EPSILON,
            mtv_epsilon: DEFAULT_MTV_EPSILON,
        }
    }
}

impl ArcadeConfig {
    pub fn with_bias(bias: ContactSolveBias) -> Self {
        Self {
            contact_solve_bias: bias,
            ..Self::default()
        }
    }
}

/// Collider behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColliderConfig {
    pub composite_strategy: CompositeStrategy,
}

/// Everything the collision pipeline reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Acceleration applied to active bodies by the tick harness
    pub gravity: Vec2,
    pub broad_phase: BroadPhaseStrategy,
    pub dynamic_tree: DynamicTreeConfig,
    pub sparse_hash_grid: SparseHashGridConfig,
    pub arcade: ArcadeConfig,
    pub colliders: ColliderConfig,
}

impl PhysicsConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        // An unknown bias is reported once by the solver that uses it
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded physics config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
