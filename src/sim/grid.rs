//! Sparse hash grid broad phase
//!
//! Space is cut into square cells. A body is listed in every cell its
//! bounds touch (edges inclusive) and only occupied cells are stored, so
//! two bodies whose bounds overlap always share at least one cell.

use std::collections::{BTreeSet, HashMap, HashSet};

use glam::{IVec2, Vec2};

use super::aabb::Aabb;
use super::body::BodyId;
use super::ray::Ray;
use crate::config::SparseHashGridConfig;
use crate::consts::DEFAULT_GRID_CELL_SIZE;
use crate::error::CollisionError;

/// Outcome of [`SparseHashGrid::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridUpdate {
    /// Still covers the same cells
    Unchanged,
    /// Re-hashed into a different set of cells
    Moved,
    /// Left the world bounds and is no longer tracked
    Untracked,
}

/// Inclusive block of cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    min: IVec2,
    max: IVec2,
}

impl CellRange {
    fn cells(self) -> impl Iterator<Item = IVec2> {
        (self.min.y..=self.max.y).flat_map(move |y| (self.min.x..=self.max.x).map(move |x| IVec2::new(x, y)))
    }

    fn contains(&self, cell: IVec2) -> bool {
        cell.cmpge(self.min).all() && cell.cmple(self.max).all()
    }

    fn area(&self) -> i64 {
        let size = self.max.as_i64vec2() - self.min.as_i64vec2() + 1;
        size.x.max(0).saturating_mul(size.y.max(0))
    }
}

#[derive(Debug, Clone)]
pub struct SparseHashGrid {
    cell_size: f32,
    world_bounds: Option<Aabb>,
    cells: HashMap<IVec2, BTreeSet<BodyId>>,
    proxies: HashMap<BodyId, CellRange>,
}

impl SparseHashGrid {
    pub fn new(config: &SparseHashGridConfig, world_bounds: Option<Aabb>) -> Self {
        let cell_size = if config.size.is_finite() && config.size > 0.0 {
            config.size
        } else {
            log::warn!("grid cell size {} is not usable; using {DEFAULT_GRID_CELL_SIZE}", config.size);
            DEFAULT_GRID_CELL_SIZE
        };
        Self {
            cell_size,
            world_bounds,
            cells: HashMap::new(),
            proxies: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of tracked bodies
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.proxies.contains_key(&id)
    }

    /// Number of occupied cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell_of(&self, p: Vec2) -> IVec2 {
        (p / self.cell_size).floor().as_ivec2()
    }

    fn range(&self, bounds: &Aabb) -> CellRange {
        CellRange {
            min: self.cell_of(bounds.min),
            max: self.cell_of(bounds.max),
        }
    }

    fn cell_bounds(&self, cell: IVec2) -> Aabb {
        Aabb::new(cell.as_vec2() * self.cell_size, (cell + 1).as_vec2() * self.cell_size)
    }

    /// Start tracking a body
    pub fn track(&mut self, id: BodyId, bounds: Aabb) -> Result<(), CollisionError> {
        if self.proxies.contains_key(&id) {
            return Err(CollisionError::DuplicateBody(id));
        }
        if !bounds.is_finite() {
            return Err(CollisionError::InvalidBody("bounds are not finite"));
        }
        let range = self.range(&bounds);
        self.link(id, range);
        self.proxies.insert(id, range);
        Ok(())
    }

    /// Stop tracking a body
    pub fn untrack(&mut self, id: BodyId) -> Result<(), CollisionError> {
        let range = self.proxies.remove(&id).ok_or(CollisionError::UnknownBody(id))?;
        self.unlink(id, range);
        Ok(())
    }

    /// Re-hash a body. Nothing happens while it covers the same cells.
    pub fn update(&mut self, id: BodyId, bounds: Aabb) -> Result<GridUpdate, CollisionError> {
        let old = *self.proxies.get(&id).ok_or(CollisionError::UnknownBody(id))?;

        if let Some(world) = self.world_bounds {
            if !world.contains(&bounds) {
                log::warn!(
                    "body {id} left the world bounds at ({:.1}, {:.1}); no longer tracked",
                    bounds.center().x,
                    bounds.center().y
                );
                self.untrack(id)?;
                return Ok(GridUpdate::Untracked);
            }
        }
        if !bounds.is_finite() {
            return Err(CollisionError::InvalidBody("bounds are not finite"));
        }

        let range = self.range(&bounds);
        if range == old {
            return Ok(GridUpdate::Unchanged);
        }
        self.unlink(id, old);
        self.link(id, range);
        self.proxies.insert(id, range);
        Ok(GridUpdate::Moved)
    }

    fn link(&mut self, id: BodyId, range: CellRange) {
        for cell in range.cells() {
            self.cells.entry(cell).or_default().insert(id);
        }
    }

    fn unlink(&mut self, id: BodyId, range: CellRange) {
        for cell in range.cells() {
            if let Some(ids) = self.cells.get_mut(&cell) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Every body sharing a cell with `bounds`, once each, in id order
    pub fn candidates(&self, bounds: &Aabb) -> BTreeSet<BodyId> {
        let range = self.range(bounds);
        let mut out = BTreeSet::new();
        // Huge query boxes scan the occupied cells instead of the range
        if range.area() > self.cells.len() as i64 {
            for (cell, ids) in &self.cells {
                if range.contains(*cell) {
                    out.extend(ids.iter().copied());
                }
            }
        } else {
            for cell in range.cells() {
                if let Some(ids) = self.cells.get(&cell) {
                    out.extend(ids.iter().copied());
                }
            }
        }
        out
    }

    /// Box around every occupied cell
    fn extent(&self) -> Option<Aabb> {
        let mut cells = self.cells.keys();
        let first = *cells.next()?;
        let (min, max) = cells.fold((first, first), |(lo, hi), c| (lo.min(*c), hi.max(*c)));
        Some(Aabb::new(
            self.cell_bounds(min).min,
            self.cell_bounds(max).max,
        ))
    }

    /// Walk cells along `ray` in order. `hit` receives a body and the current
    /// best distance and returns an exact hit, if any; the walk stops once
    /// the best hit lies inside the cells already visited.
    pub fn ray_cast<T, F>(&self, ray: &Ray, max_distance: f32, mut hit: F) -> Option<(f32, T)>
    where
        F: FnMut(BodyId, f32) -> Option<(f32, T)>,
    {
        if !(max_distance >= 0.0) || !ray.pos.is_finite() {
            return None;
        }
        let limit = max_distance.min(exit_distance(&self.extent()?, ray)?);

        let size = self.cell_size;
        let boundary = |cell: i32, pos: f32, dir: f32| -> f32 {
            if dir > 0.0 {
                ((cell + 1) as f32 * size - pos) / dir
            } else if dir < 0.0 {
                (cell as f32 * size - pos) / dir
            } else {
                f32::INFINITY
            }
        };
        let step_len = |dir: f32| if dir == 0.0 { f32::INFINITY } else { size / dir.abs() };

        let mut cell = self.cell_of(ray.pos);
        let step = IVec2::new(ray.dir.x.signum() as i32, ray.dir.y.signum() as i32);
        let delta = Vec2::new(step_len(ray.dir.x), step_len(ray.dir.y));
        let mut t_max = Vec2::new(
            boundary(cell.x, ray.pos.x, ray.dir.x),
            boundary(cell.y, ray.pos.y, ray.dir.y),
        );

        let mut best: Option<(f32, T)> = None;
        let mut tested = HashSet::new();
        loop {
            if let Some(ids) = self.cells.get(&cell) {
                for &id in ids {
                    if !tested.insert(id) {
                        continue;
                    }
                    let bound = best.as_ref().map_or(max_distance, |b| b.0);
                    if let Some((t, data)) = hit(id, bound) {
                        if t <= bound {
                            best = Some((t, data));
                        }
                    }
                }
            }

            let cell_exit = t_max.x.min(t_max.y);
            if best.as_ref().is_some_and(|b| b.0 <= cell_exit) || cell_exit > limit || !cell_exit.is_finite() {
                break;
            }
            if t_max.x < t_max.y {
                cell.x += step.x;
                t_max.x += delta.x;
            } else {
                cell.y += step.y;
                t_max.y += delta.y;
            }
        }
        best
    }

    /// World box of every occupied cell
    pub fn occupied_cells(&self) -> impl Iterator<Item = Aabb> + '_ {
        self.cells.keys().map(|cell| self.cell_bounds(*cell))
    }
}

/// Distance at which `ray` leaves `bounds`, if it ever is inside
fn exit_distance(bounds: &Aabb, ray: &Ray) -> Option<f32> {
    let mut t_min = 0.0_f32;
    let mut t_max = f32::INFINITY;
    for axis in 0..2 {
        let (pos, dir) = (ray.pos[axis], ray.dir[axis]);
        let (lo, hi) = (bounds.min[axis], bounds.max[axis]);
        if dir == 0.0 {
            if pos < lo || pos > hi {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo - pos) / dir, (hi - pos) / dir);
        t_min = t_min.max(a.min(b));
        t_max = t_max.min(a.max(b));
    }
    (t_max >= t_min).then_some(t_max)
}
