//! Deterministic collision pipeline
//!
//! Everything that decides where bodies end up lives here. The pipeline
//! must stay deterministic:
//! - Fixed timestep only
//! - Stable iteration order (by body id)
//! - No rendering or platform dependencies

pub mod aabb;
pub mod body;
pub mod collision;
pub mod contact;
pub mod grid;
pub mod pair;
pub mod polygon;
pub mod ray;
pub mod resolver;
pub mod shape;
pub mod side;
pub mod solver;
pub mod state;
pub mod tick;
pub mod tree;

pub use aabb::Aabb;
pub use body::{Body, BodyBuilder, BodyId, BodySet, CollisionGroup, CollisionType};
pub use collision::{Manifold, collide_shapes};
pub use contact::{CollisionContact, ContactId, ContactPoint};
pub use pair::{Pair, PairId};
pub use polygon::{ConvexPolygon, FeatureId};
pub use ray::{Ray, RayCastHit};
pub use grid::{GridUpdate, SparseHashGrid};
pub use resolver::{CollisionResolver, DynamicTreeResolver, NaiveResolver, SparseHashGridResolver};
pub use shape::{Shape, WorldShape};
pub use side::Side;
pub use solver::{ArcadeSolver, ContactOutcome, SolveReport};
pub use state::World;
pub use tick::{TickReport, run_frame, tick};
pub use tree::{DynamicTree, TreeUpdate};
