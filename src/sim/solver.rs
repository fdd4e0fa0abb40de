//! Arcade contact solver
//!
//! Per tick: `pre_solve` drops degenerate contacts, `order` applies the
//! configured bias, then every contact is position-solved before any is
//! velocity-solved. Position solving works from the live geometry, so a
//! contact already fixed by an earlier one in the same tick cancels itself
//! instead of pushing twice. Velocity solving is inelastic and approach-only.
//!
//! The solver never returns errors. Degenerate or non-finite input cancels
//! the contact involved and logs once through [`Diagnostics`].

use std::collections::{BTreeMap, HashSet};

use glam::Vec2;

use super::body::{Body, BodyId, BodySet, CollisionType};
use super::contact::CollisionContact;
use super::pair::PairId;
use super::side::Side;
use crate::config::{ArcadeConfig, CompositeStrategy, ContactSolveBias};
use crate::debug::DebugLines;
use crate::diagnostics::Diagnostics;
use crate::project;

/// What happened to a touching pair this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactOutcome {
    /// The pair was not touching last tick
    Started { a: BodyId, b: BodyId, side: Side, mtv: Vec2 },
    /// The pair was already touching last tick
    Continuing { a: BodyId, b: BodyId, side: Side, mtv: Vec2 },
    /// The pair touched last tick but not this one
    Ended { a: BodyId, b: BodyId },
}

impl ContactOutcome {
    pub fn bodies(&self) -> (BodyId, BodyId) {
        match *self {
            ContactOutcome::Started { a, b, .. }
            | ContactOutcome::Continuing { a, b, .. }
            | ContactOutcome::Ended { a, b } => (a, b),
        }
    }

    pub fn pair_id(&self) -> PairId {
        let (a, b) = self.bodies();
        PairId::new(a, b)
    }

    pub fn involves(&self, body: BodyId) -> bool {
        let (a, b) = self.bodies();
        a == body || b == body
    }

    /// Side of `body` the contact is on. `None` for an ended contact or an
    /// unrelated body.
    pub fn side_for(&self, body: BodyId) -> Option<Side> {
        match *self {
            ContactOutcome::Started { a, b, side, .. } | ContactOutcome::Continuing { a, b, side, .. } => {
                if body == a {
                    Some(side)
                } else if body == b {
                    Some(side.opposite())
                } else {
                    None
                }
            }
            ContactOutcome::Ended { .. } => None,
        }
    }
}

/// Everything one call to [`ArcadeSolver::solve`] produced
#[derive(Debug, Clone, Default)]
pub struct SolveReport {
    /// Contacts in the order they were solved, then those dropped by
    /// `pre_solve`
    pub contacts: Vec<CollisionContact>,
    pub outcomes: Vec<ContactOutcome>,
}

impl SolveReport {
    /// Contacts that survived the whole tick
    pub fn resolved(&self) -> impl Iterator<Item = &CollisionContact> {
        self.contacts.iter().filter(|c| !c.is_canceled())
    }
}

#[derive(Debug, Clone, Copy)]
struct Touch {
    a: BodyId,
    b: BodyId,
    side: Side,
    mtv: Vec2,
}

/// Non-physical, overlap-removing solver
#[derive(Debug, Clone)]
pub struct ArcadeSolver {
    config: ArcadeConfig,
    composite: CompositeStrategy,
    diagnostics: Diagnostics,
    touching: BTreeMap<PairId, Touch>,
}

impl ArcadeSolver {
    pub fn new(config: &ArcadeConfig, composite: CompositeStrategy) -> Self {
        Self {
            config: config.clone(),
            composite,
            diagnostics: Diagnostics::new(),
            touching: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &ArcadeConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Contact points and normals of the last report, canceled ones greyed
    pub fn debug_draw(&self, report: &SolveReport, lines: &mut DebugLines) {
        lines.draw_contacts(&report.contacts);
    }

    fn mtv_is_negligible(&self, mtv: Vec2) -> bool {
        mtv.x.abs() < self.config.mtv_epsilon && mtv.y.abs() < self.config.mtv_epsilon
    }

    /// Full tick: pre-solve, order, position, velocity, outcomes
    pub fn solve(&mut self, contacts: Vec<CollisionContact>, bodies: &mut BodySet) -> SolveReport {
        let mut contacts = contacts;
        self.pre_solve(&mut contacts);

        let (mut live, dropped): (Vec<_>, Vec<_>) = contacts.into_iter().partition(|c| !c.is_canceled());
        self.order(&mut live);

        for contact in live.iter_mut() {
            self.solve_position(contact, bodies);
        }
        for contact in live.iter_mut() {
            self.solve_velocity(contact, bodies);
        }

        let outcomes = self.post_solve(&live);
        log::debug!(
            "solved {} contacts ({} dropped early, {} outcomes)",
            live.len(),
            dropped.len(),
            outcomes.len()
        );

        live.extend(dropped);
        SolveReport {
            contacts: live,
            outcomes,
        }
    }

    /// Cancel contacts with a negligible or non-finite mtv. With the
    /// `together` composite strategy only the first surviving contact of
    /// each body pair is kept.
    pub fn pre_solve(&mut self, contacts: &mut [CollisionContact]) {
        let mut seen: HashSet<PairId> = HashSet::new();
        for contact in contacts.iter_mut() {
            if contact.is_canceled() {
                continue;
            }
            if !contact.mtv.is_finite() {
                let (a, b) = (contact.a, contact.b);
                self.diagnostics.warn_once("non-finite-mtv", || {
                    format!("contact between {a} and {b} has a non-finite mtv; canceling")
                });
                contact.cancel();
                continue;
            }
            if self.mtv_is_negligible(contact.mtv) {
                contact.cancel();
                continue;
            }
            if self.composite == CompositeStrategy::Together && !seen.insert(contact.pair_id()) {
                contact.cancel();
            }
        }
    }

    /// Stable sort by the configured bias, then by separation depth.
    /// Without a bias contacts stay in discovery order.
    pub fn order(&mut self, contacts: &mut [CollisionContact]) {
        let horizontal_rank = match &self.config.contact_solve_bias {
            ContactSolveBias::None => return,
            ContactSolveBias::Unrecognized(name) => {
                let name = name.clone();
                self.diagnostics.warn_once("unrecognized-bias", || {
                    format!("unrecognized contact solve bias {name:?}; using discovery order")
                });
                return;
            }
            ContactSolveBias::VerticalFirst => 1,
            ContactSolveBias::HorizontalFirst => 0,
        };
        let rank = |c: &CollisionContact| -> u8 {
            if Side::from_direction(c.mtv).is_horizontal() {
                horizontal_rank
            } else {
                1 - horizontal_rank
            }
        };
        contacts.sort_by(|x, y| {
            rank(x)
                .cmp(&rank(y))
                .then(x.separation.abs().total_cmp(&y.separation.abs()))
        });
    }

    /// Push the bodies apart by their current overlap along the normal.
    /// Cancels the contact when the bodies no longer overlap.
    pub fn solve_position(&mut self, contact: &mut CollisionContact, bodies: &mut BodySet) {
        if contact.is_canceled() {
            return;
        }
        let Some((a, b)) = self.bodies_of(contact, bodies) else {
            contact.cancel();
            return;
        };

        if !a.bounds().overlaps_by(&b.bounds(), self.config.overlap_epsilon) {
            contact.cancel();
            return;
        }
        if self.mtv_is_negligible(contact.mtv) {
            contact.cancel();
            return;
        }
        if is_passive(a) || is_passive(b) {
            return;
        }

        let Some(depth) = live_depth(a, b, contact, self.config.overlap_epsilon) else {
            contact.cancel();
            return;
        };

        let (inv_a, inv_b) = (a.inverse_mass(), b.inverse_mass());
        let total = inv_a + inv_b;
        if total <= 0.0 {
            return;
        }
        let correction = contact.normal * depth;
        let move_a = -correction * (inv_a / total);
        let move_b = correction * (inv_b / total);
        if !move_a.is_finite() || !move_b.is_finite() {
            let (ia, ib) = (contact.a, contact.b);
            self.diagnostics.warn_once("non-finite-correction", || {
                format!("position correction between {ia} and {ib} is not finite; canceling")
            });
            contact.cancel();
            return;
        }

        let (id_a, id_b) = (contact.a, contact.b);
        if inv_a > 0.0 {
            if let Some(body) = bodies.get_mut(id_a) {
                body.translate(move_a);
            }
        }
        if inv_b > 0.0 {
            if let Some(body) = bodies.get_mut(id_b) {
                body.translate(move_b);
            }
        }
    }

    /// Remove the normal component of an approaching body's velocity.
    /// Bodies already separating keep their velocity; the contact is never
    /// canceled for that.
    pub fn solve_velocity(&mut self, contact: &mut CollisionContact, bodies: &mut BodySet) {
        if contact.is_canceled() {
            return;
        }
        let Some((a, b)) = self.bodies_of(contact, bodies) else {
            contact.cancel();
            return;
        };
        if is_passive(a) || is_passive(b) {
            return;
        }

        let n = contact.normal;
        let (vel_a, vel_b) = (a.vel(), b.vel());
        let approach = (vel_a - vel_b).dot(n);
        if !approach.is_finite() {
            let (ia, ib) = (contact.a, contact.b);
            self.diagnostics.warn_once("non-finite-velocity", || {
                format!("velocity between {ia} and {ib} is not finite; canceling")
            });
            contact.cancel();
            return;
        }
        if approach <= 0.0 {
            return;
        }

        let adjust_a = a.collision_type() == CollisionType::Active && vel_a.dot(n) > 0.0;
        let adjust_b = b.collision_type() == CollisionType::Active && vel_b.dot(n) < 0.0;
        let (id_a, id_b) = (contact.a, contact.b);
        if adjust_a {
            if let Some(body) = bodies.get_mut(id_a) {
                body.set_vel(vel_a - n * vel_a.dot(n));
            }
        }
        if adjust_b {
            if let Some(body) = bodies.get_mut(id_b) {
                body.set_vel(vel_b - n * vel_b.dot(n));
            }
        }
    }

    /// Compare surviving contacts with last tick's touching pairs
    fn post_solve(&mut self, contacts: &[CollisionContact]) -> Vec<ContactOutcome> {
        let mut current: BTreeMap<PairId, Touch> = BTreeMap::new();
        for contact in contacts.iter().filter(|c| !c.is_canceled()) {
            current.entry(contact.pair_id()).or_insert(Touch {
                a: contact.a,
                b: contact.b,
                side: contact.side(),
                mtv: contact.mtv,
            });
        }

        let mut outcomes = Vec::with_capacity(current.len());
        for (id, touch) in &current {
            let Touch { a, b, side, mtv } = *touch;
            if self.touching.contains_key(id) {
                outcomes.push(ContactOutcome::Continuing { a, b, side, mtv });
            } else {
                outcomes.push(ContactOutcome::Started { a, b, side, mtv });
            }
        }
        for (id, touch) in &self.touching {
            if !current.contains_key(id) {
                outcomes.push(ContactOutcome::Ended { a: touch.a, b: touch.b });
            }
        }

        self.touching = current;
        outcomes
    }

    fn bodies_of<'a>(&mut self, contact: &CollisionContact, bodies: &'a BodySet) -> Option<(&'a Body, &'a Body)> {
        match (bodies.get(contact.a), bodies.get(contact.b)) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => {
                let (ia, ib) = (contact.a, contact.b);
                self.diagnostics.warn_once("missing-body", || {
                    format!("contact between {ia} and {ib} refers to a removed body; canceling")
                });
                None
            }
        }
    }
}

fn is_passive(body: &Body) -> bool {
    body.collision_type() == CollisionType::Passive
}

/// Current penetration of the contact's sub-shapes along its normal, or
/// `None` once they overlap by no more than `epsilon`
fn live_depth(a: &Body, b: &Body, contact: &CollisionContact, epsilon: f32) -> Option<f32> {
    let outline = |body: &Body, index: u16| -> Vec<glam::Vec2> {
        body.world_shapes()
            .get(index as usize)
            .map(|s| s.points())
            .unwrap_or_else(|| body.bounds().corners().to_vec())
    };
    let points_a = outline(a, contact.id.shape_a);
    let points_b = outline(b, contact.id.shape_b);

    let n = contact.normal;
    let (min_a, max_a) = project(&points_a, n);
    let (min_b, max_b) = project(&points_b, n);
    let overlap = max_a.min(max_b) - min_a.max(min_b);
    if overlap.is_nan() || overlap <= epsilon {
        return None;
    }
    Some(max_a - min_b)
}
