//! Constraint solver keeping connected handles glued to their ports.
//!
//! Every connection owns one [`PortConstraint`]. Moving an item marks the
//! constraints touching it dirty; [`Solver::solve`] then projects each
//! dirty handle back onto its port.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::item::{HandleIndex, ItemGeometry, ItemId, PortIndex};

/// Identifier of a constraint registered with the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub u64);

/// Keeps `item`'s `handle` on `connected`'s `port`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConstraint {
    pub item: ItemId,
    pub handle: HandleIndex,
    pub connected: ItemId,
    pub port: PortIndex,
}

#[derive(Debug, Default)]
pub struct Solver {
    constraints: BTreeMap<ConstraintId, PortConstraint>,
    dirty: BTreeSet<ConstraintId>,
    next_id: u64,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constraint; it is solved on the next [`Solver::solve`]
    pub fn add_constraint(&mut self, constraint: PortConstraint) -> ConstraintId {
        let id = ConstraintId(self.next_id);
        self.next_id += 1;
        self.constraints.insert(id, constraint);
        self.dirty.insert(id);
        id
    }

    /// Drop a constraint. Returns false if it was not registered.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        self.dirty.remove(&id);
        self.constraints.remove(&id).is_some()
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&PortConstraint> {
        self.constraints.get(&id)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Whether any constraint waits to be solved
    pub fn needs_solving(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Mark every constraint touching `item` for re-solving
    pub fn request_resolve(&mut self, item: ItemId) {
        for (id, c) in &self.constraints {
            if c.item == item || c.connected == item {
                self.dirty.insert(*id);
            }
        }
    }

    /// Settle all pending constraints.
    ///
    /// A glued handle may itself be the end of a port another handle is
    /// glued to (line on line), so solving repeats until nothing moves,
    /// bounded by the number of constraints.
    pub fn solve(&mut self, items: &mut IndexMap<ItemId, ItemGeometry>) {
        let mut rounds = 0;
        while !self.dirty.is_empty() && rounds <= self.constraints.len() {
            rounds += 1;
            let pending = std::mem::take(&mut self.dirty);
            let mut moved = Vec::new();

            for id in pending {
                let Some(c) = self.constraints.get(&id) else {
                    continue;
                };
                let Some(current) = items.get(&c.item).and_then(|g| g.handle(c.handle)).map(|h| h.pos)
                else {
                    continue;
                };
                let Some((glued, _)) = items.get(&c.connected).and_then(|g| g.glue(c.port, current))
                else {
                    continue;
                };
                if glued != current {
                    if let Some(geom) = items.get_mut(&c.item) {
                        geom.set_handle_pos(c.handle, glued);
                        moved.push(c.item);
                    }
                }
            }

            for item in moved {
                for (id, c) in &self.constraints {
                    if c.connected == item {
                        self.dirty.insert(*id);
                    }
                }
            }
        }
        trace!(rounds, "solver settled");
        self.dirty.clear();
    }
}
