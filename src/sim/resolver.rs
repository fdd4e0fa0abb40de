//! Broad phase strategies
//!
//! Every strategy answers the same questions: which bodies moved
//! (`update`), which pairs need a narrow-phase test (`evaluate`), and
//! spatial queries. The scene picks one at construction through
//! [`CollisionResolver`].

use std::collections::{BTreeSet, HashSet};
use std::ops::ControlFlow;

use glam::Vec2;

use super::aabb::Aabb;
use super::body::{Body, BodyId, BodySet, CollisionType};
use super::grid::{GridUpdate, SparseHashGrid};
use super::pair::{Pair, PairId};
use super::ray::{Ray, RayCastHit};
use super::tree::{DynamicTree, TreeUpdate};
use crate::config::{BroadPhaseStrategy, DynamicTreeConfig, PhysicsConfig, SparseHashGridConfig};
use crate::debug::{DebugLines, colors};
use crate::error::CollisionError;

/// Bodies that take part in the broad phase at all
fn is_candidate(body: &Body) -> bool {
    body.is_active() && body.collision_type() != CollisionType::PreventCollision
}

fn warn_left_world(body: &Body) {
    let center = body.bounds().center();
    log::warn!(
        "body {} left the world bounds at ({:.1}, {:.1}); no longer tracked",
        body.id(),
        center.x,
        center.y
    );
}

/// Exact ray test against every sub-shape of `body`
fn ray_cast_body(body: &Body, ray: &Ray, max_distance: f32) -> Option<(f32, Vec2)> {
    body.world_shapes()
        .iter()
        .filter_map(|shape| shape.ray_cast(ray, max_distance))
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

/// Tests every tracked body against every other one
#[derive(Debug, Clone, Default)]
pub struct NaiveResolver {
    tracked: BTreeSet<BodyId>,
    world_bounds: Option<Aabb>,
}

impl NaiveResolver {
    pub fn new(world_bounds: Option<Aabb>) -> Self {
        Self {
            tracked: BTreeSet::new(),
            world_bounds,
        }
    }

    pub fn register(&mut self, body: &Body) -> Result<(), CollisionError> {
        if !self.tracked.insert(body.id()) {
            return Err(CollisionError::DuplicateBody(body.id()));
        }
        Ok(())
    }

    pub fn unregister(&mut self, id: BodyId) -> Result<(), CollisionError> {
        if !self.tracked.remove(&id) {
            return Err(CollisionError::UnknownBody(id));
        }
        Ok(())
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.tracked.contains(&id)
    }

    /// Nothing is cached between ticks, so nothing ever needs moving.
    /// Bodies outside the world bounds stop being tracked.
    pub fn update(&mut self, bodies: &BodySet) -> usize {
        if let Some(world) = self.world_bounds {
            self.tracked.retain(|id| match bodies.get(*id) {
                Some(body) if !world.contains(&body.bounds()) => {
                    warn_left_world(body);
                    false
                }
                _ => true,
            });
        }
        0
    }

    pub fn evaluate(&self, bodies: &BodySet) -> Vec<Pair> {
        let live: Vec<&Body> = self
            .tracked
            .iter()
            .filter_map(|id| bodies.get(*id))
            .filter(|b| is_candidate(b))
            .collect();

        let mut pairs = Vec::new();
        for (i, a) in live.iter().enumerate() {
            let bounds = a.bounds();
            for b in &live[i + 1..] {
                if bounds.overlaps(&b.bounds()) && Pair::can_collide(a, b) {
                    pairs.push(Pair::new(a.id(), b.id()));
                }
            }
        }
        pairs
    }

    pub fn query(&self, bounds: &Aabb, bodies: &BodySet) -> Vec<BodyId> {
        self.tracked
            .iter()
            .filter(|id| bodies.get(**id).is_some_and(|b| b.bounds().overlaps(bounds)))
            .copied()
            .collect()
    }

    pub fn ray_cast(&self, ray: &Ray, max_distance: f32, bodies: &BodySet) -> Option<RayCastHit> {
        let mut best: Option<RayCastHit> = None;
        for body in self.tracked.iter().filter_map(|id| bodies.get(*id)).filter(|b| is_candidate(b)) {
            let limit = best.as_ref().map_or(max_distance, |h| h.distance);
            if let Some((t, normal)) = ray_cast_body(body, ray, limit) {
                if best.as_ref().is_none_or(|h| t < h.distance) {
                    best = Some(RayCastHit {
                        body: body.id(),
                        point: ray.at(t),
                        normal,
                        distance: t,
                    });
                }
            }
        }
        best
    }
}

/// Broad phase over a [`DynamicTree`]
#[derive(Debug, Clone)]
pub struct DynamicTreeResolver {
    tree: DynamicTree,
}

impl DynamicTreeResolver {
    pub fn new(config: &DynamicTreeConfig) -> Self {
        Self {
            tree: DynamicTree::new(config),
        }
    }

    pub fn tree(&self) -> &DynamicTree {
        &self.tree
    }

    pub fn register(&mut self, body: &Body) -> Result<(), CollisionError> {
        self.tree.track(body.id(), body.bounds(), body.vel())
    }

    pub fn unregister(&mut self, id: BodyId) -> Result<(), CollisionError> {
        self.tree.untrack(id)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.tree.contains(id)
    }

    /// Refit every tracked body; returns how many leaves were reinserted
    pub fn update(&mut self, bodies: &BodySet) -> usize {
        let mut moved = 0;
        for body in bodies.iter() {
            if !self.tree.contains(body.id()) {
                continue;
            }
            match self.tree.update(body.id(), body.bounds(), body.vel()) {
                Ok(TreeUpdate::Moved) => moved += 1,
                Ok(TreeUpdate::Unchanged | TreeUpdate::Untracked) => {}
                Err(e) => log::error!("tree update for body {} failed: {e}", body.id()),
            }
        }
        moved
    }

    /// Query the tree with each body's bounds, in id order. A pair is
    /// emitted once, ordered by whichever body found it first.
    pub fn evaluate(&self, bodies: &BodySet) -> Vec<Pair> {
        let mut seen: HashSet<PairId> = HashSet::new();
        let mut pairs = Vec::new();
        for body in bodies.iter().filter(|b| is_candidate(b) && self.tree.contains(b.id())) {
            self.tree.query(&body.bounds(), Some(body.id()), |other_id| {
                let pair_id = PairId::new(body.id(), other_id);
                if seen.contains(&pair_id) {
                    return ControlFlow::Continue(());
                }
                if let Some(other) = bodies.get(other_id) {
                    if Pair::can_collide(body, other) {
                        seen.insert(pair_id);
                        pairs.push(Pair::new(body.id(), other_id));
                    }
                }
                ControlFlow::Continue(())
            });
        }
        pairs
    }

    pub fn query(&self, bounds: &Aabb, bodies: &BodySet) -> Vec<BodyId> {
        let mut out = Vec::new();
        self.tree.query(bounds, None, |id| {
            if bodies.get(id).is_some_and(|b| b.bounds().overlaps(bounds)) {
                out.push(id);
            }
            ControlFlow::Continue(())
        });
        out.sort();
        out
    }

    pub fn ray_cast(&self, ray: &Ray, max_distance: f32, bodies: &BodySet) -> Option<RayCastHit> {
        let (distance, (body, normal)) = self.tree.ray_cast(ray, max_distance, |id, limit| {
            let body = bodies.get(id).filter(|b| is_candidate(b))?;
            let (t, normal) = ray_cast_body(body, ray, limit)?;
            Some((t, (id, normal)))
        })?;
        Some(RayCastHit {
            body,
            point: ray.at(distance),
            normal,
            distance,
        })
    }
}

/// Broad phase over a [`SparseHashGrid`]
#[derive(Debug, Clone)]
pub struct SparseHashGridResolver {
    grid: SparseHashGrid,
}

impl SparseHashGridResolver {
    pub fn new(config: &SparseHashGridConfig, world_bounds: Option<Aabb>) -> Self {
        Self {
            grid: SparseHashGrid::new(config, world_bounds),
        }
    }

    pub fn grid(&self) -> &SparseHashGrid {
        &self.grid
    }

    pub fn register(&mut self, body: &Body) -> Result<(), CollisionError> {
        self.grid.track(body.id(), body.bounds())
    }

    pub fn unregister(&mut self, id: BodyId) -> Result<(), CollisionError> {
        self.grid.untrack(id)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.grid.contains(id)
    }

    /// Re-hash every tracked body; returns how many changed cells
    pub fn update(&mut self, bodies: &BodySet) -> usize {
        let mut moved = 0;
        for body in bodies.iter() {
            if !self.grid.contains(body.id()) {
                continue;
            }
            match self.grid.update(body.id(), body.bounds()) {
                Ok(GridUpdate::Moved) => moved += 1,
                Ok(GridUpdate::Unchanged | GridUpdate::Untracked) => {}
                Err(e) => log::error!("grid update for body {} failed: {e}", body.id()),
            }
        }
        moved
    }

    /// Bodies sharing a cell are candidates; only overlapping bounds make
    /// a pair. Walks bodies in id order like the tree.
    pub fn evaluate(&self, bodies: &BodySet) -> Vec<Pair> {
        let mut seen: HashSet<PairId> = HashSet::new();
        let mut pairs = Vec::new();
        for body in bodies.iter().filter(|b| is_candidate(b) && self.grid.contains(b.id())) {
            let bounds = body.bounds();
            for other_id in self.grid.candidates(&bounds) {
                if other_id == body.id() {
                    continue;
                }
                let pair_id = PairId::new(body.id(), other_id);
                if seen.contains(&pair_id) {
                    continue;
                }
                let Some(other) = bodies.get(other_id) else {
                    continue;
                };
                if is_candidate(other) && bounds.overlaps(&other.bounds()) && Pair::can_collide(body, other) {
                    seen.insert(pair_id);
                    pairs.push(Pair::new(body.id(), other_id));
                }
            }
        }
        pairs
    }

    pub fn query(&self, bounds: &Aabb, bodies: &BodySet) -> Vec<BodyId> {
        self.grid
            .candidates(bounds)
            .into_iter()
            .filter(|id| bodies.get(*id).is_some_and(|b| b.bounds().overlaps(bounds)))
            .collect()
    }

    pub fn ray_cast(&self, ray: &Ray, max_distance: f32, bodies: &BodySet) -> Option<RayCastHit> {
        let (distance, (body, normal)) = self.grid.ray_cast(ray, max_distance, |id, limit| {
            let body = bodies.get(id).filter(|b| is_candidate(b))?;
            let (t, normal) = ray_cast_body(body, ray, limit)?;
            Some((t, (id, normal)))
        })?;
        Some(RayCastHit {
            body,
            point: ray.at(distance),
            normal,
            distance,
        })
    }
}

/// The broad phase chosen for a scene
#[derive(Debug, Clone)]
pub enum CollisionResolver {
    Naive(NaiveResolver),
    DynamicTree(DynamicTreeResolver),
    SparseHashGrid(SparseHashGridResolver),
}

impl CollisionResolver {
    /// Build the strategy named by `config.broad_phase`. The world bounds
    /// in `dynamic_tree` apply to every strategy.
    pub fn new(config: &PhysicsConfig) -> Self {
        let world_bounds = config.dynamic_tree.world_bounds;
        match config.broad_phase {
            BroadPhaseStrategy::Naive => CollisionResolver::Naive(NaiveResolver::new(world_bounds)),
            BroadPhaseStrategy::DynamicTree => {
                CollisionResolver::DynamicTree(DynamicTreeResolver::new(&config.dynamic_tree))
            }
            BroadPhaseStrategy::SparseHashGrid => CollisionResolver::SparseHashGrid(SparseHashGridResolver::new(
                &config.sparse_hash_grid,
                world_bounds,
            )),
        }
    }

    pub fn strategy(&self) -> BroadPhaseStrategy {
        match self {
            CollisionResolver::Naive(_) => BroadPhaseStrategy::Naive,
            CollisionResolver::DynamicTree(_) => BroadPhaseStrategy::DynamicTree,
            CollisionResolver::SparseHashGrid(_) => BroadPhaseStrategy::SparseHashGrid,
        }
    }

    pub fn register(&mut self, body: &Body) -> Result<(), CollisionError> {
        match self {
            CollisionResolver::Naive(r) => r.register(body),
            CollisionResolver::DynamicTree(r) => r.register(body),
            CollisionResolver::SparseHashGrid(r) => r.register(body),
        }
    }

    pub fn unregister(&mut self, id: BodyId) -> Result<(), CollisionError> {
        match self {
            CollisionResolver::Naive(r) => r.unregister(id),
            CollisionResolver::DynamicTree(r) => r.unregister(id),
            CollisionResolver::SparseHashGrid(r) => r.unregister(id),
        }
    }

    pub fn contains(&self, id: BodyId) -> bool {
        match self {
            CollisionResolver::Naive(r) => r.contains(id),
            CollisionResolver::DynamicTree(r) => r.contains(id),
            CollisionResolver::SparseHashGrid(r) => r.contains(id),
        }
    }

    /// Bring the broad phase up to date; returns the number of bodies that
    /// needed restructuring
    pub fn update(&mut self, bodies: &BodySet) -> usize {
        match self {
            CollisionResolver::Naive(r) => r.update(bodies),
            CollisionResolver::DynamicTree(r) => r.update(bodies),
            CollisionResolver::SparseHashGrid(r) => r.update(bodies),
        }
    }

    /// Deduplicated candidate pairs in discovery order
    pub fn evaluate(&self, bodies: &BodySet) -> Vec<Pair> {
        let pairs = match self {
            CollisionResolver::Naive(r) => r.evaluate(bodies),
            CollisionResolver::DynamicTree(r) => r.evaluate(bodies),
            CollisionResolver::SparseHashGrid(r) => r.evaluate(bodies),
        };
        log::trace!("broad phase produced {} pairs", pairs.len());
        pairs
    }

    /// Bodies whose bounds overlap `bounds`, in id order
    pub fn query(&self, bounds: &Aabb, bodies: &BodySet) -> Vec<BodyId> {
        match self {
            CollisionResolver::Naive(r) => r.query(bounds, bodies),
            CollisionResolver::DynamicTree(r) => r.query(bounds, bodies),
            CollisionResolver::SparseHashGrid(r) => r.query(bounds, bodies),
        }
    }

    /// Bodies with at least one sub-shape containing `point`
    pub fn query_point(&self, point: Vec2, bodies: &BodySet) -> Vec<BodyId> {
        let at = Aabb::new(point, point);
        self.query(&at, bodies)
            .into_iter()
            .filter(|id| {
                bodies.get(*id).is_some_and(|b| {
                    b.world_shapes().iter().any(|s| s.bounds().contains_point(point) && contains_point(&s.points(), point))
                })
            })
            .collect()
    }

    /// Closest exact hit along `ray` within `max_distance`
    pub fn ray_cast(&self, ray: &Ray, max_distance: f32, bodies: &BodySet) -> Option<RayCastHit> {
        match self {
            CollisionResolver::Naive(r) => r.ray_cast(ray, max_distance, bodies),
            CollisionResolver::DynamicTree(r) => r.ray_cast(ray, max_distance, bodies),
            CollisionResolver::SparseHashGrid(r) => r.ray_cast(ray, max_distance, bodies),
        }
    }

    /// Broad phase boxes: tree nodes for the tree, occupied cells for the
    /// grid, tracked body bounds for the naive strategy
    pub fn debug_draw(&self, bodies: &BodySet, lines: &mut DebugLines) {
        match self {
            CollisionResolver::Naive(r) => {
                for body in r.tracked.iter().filter_map(|id| bodies.get(*id)) {
                    lines.push_rect(&body.bounds(), colors::BROAD_PHASE_LEAF);
                }
            }
            CollisionResolver::DynamicTree(r) => {
                for (bounds, body) in r.tree.nodes() {
                    let color = if body.is_some() {
                        colors::BROAD_PHASE_LEAF
                    } else {
                        colors::BROAD_PHASE_NODE
                    };
                    lines.push_rect(bounds, color);
                }
            }
            CollisionResolver::SparseHashGrid(r) => {
                for cell in r.grid.occupied_cells() {
                    lines.push_rect(&cell, colors::BROAD_PHASE_NODE);
                }
            }
        }
    }
}

/// Point-in-convex-outline test, inclusive of the boundary
fn contains_point(points: &[Vec2], p: Vec2) -> bool {
    let n = points.len();
    let mut sign = 0.0_f32;
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        let cross = (b - a).perp_dot(p - a);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}
