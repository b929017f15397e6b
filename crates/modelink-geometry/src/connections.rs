//! Connection registry: which handle is attached to which port.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::item::{HandleIndex, ItemId, PortIndex};
use crate::solver::{ConstraintId, PortConstraint, Solver};

/// One attached handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Item owning the handle (usually a line)
    pub item: ItemId,
    pub handle: HandleIndex,
    /// Item owning the port
    pub connected: ItemId,
    pub port: PortIndex,
    /// Geometric constraint, `None` once it has been removed from the solver
    pub constraint: Option<ConstraintId>,
}

/// Registry of connections plus the solver that owns their constraints.
///
/// Records are kept in insertion order; queries iterate in that order.
#[derive(Debug, Default)]
pub struct Connections {
    records: Vec<Connection>,
    solver: Solver,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut Solver {
        &mut self.solver
    }

    /// Attach `item`'s `handle` to `connected`'s `port`.
    ///
    /// A handle can only have one connection at a time.
    pub fn connect_item(
        &mut self,
        item: ItemId,
        handle: HandleIndex,
        connected: ItemId,
        port: PortIndex,
    ) -> Result<ConstraintId> {
        if self.get_connection(item, handle).is_some() {
            bail!("{} of item {} is already connected", handle, item);
        }
        let constraint = self.solver.add_constraint(PortConstraint {
            item,
            handle,
            connected,
            port,
        });
        self.records.push(Connection {
            item,
            handle,
            connected,
            port,
            constraint: Some(constraint),
        });
        debug!(%item, %handle, %connected, %port, "connected");
        Ok(constraint)
    }

    /// Remove the connection of a handle and its constraint
    pub fn disconnect_item(&mut self, item: ItemId, handle: HandleIndex) -> Option<Connection> {
        let index = self
            .records
            .iter()
            .position(|c| c.item == item && c.handle == handle)?;
        let removed = self.records.remove(index);
        if let Some(constraint) = removed.constraint {
            self.solver.remove_constraint(constraint);
        }
        debug!(%item, %handle, connected = %removed.connected, "disconnected");
        Some(removed)
    }

    /// Move an existing connection to another port of the same item.
    ///
    /// The old constraint is replaced; the connected item stays the same.
    pub fn reconnect_item(&mut self, item: ItemId, handle: HandleIndex, port: PortIndex) -> Result<ConstraintId> {
        let Some(record) = self
            .records
            .iter_mut()
            .find(|c| c.item == item && c.handle == handle)
        else {
            bail!("{} of item {} is not connected", handle, item);
        };
        if let Some(old) = record.constraint.take() {
            self.solver.remove_constraint(old);
        }
        let constraint = self.solver.add_constraint(PortConstraint {
            item,
            handle,
            connected: record.connected,
            port,
        });
        record.port = port;
        record.constraint = Some(constraint);
        debug!(%item, %handle, %port, "reconnected");
        Ok(constraint)
    }

    /// Remove a constraint from the solver, leaving the connection record
    pub fn remove_constraint(&mut self, constraint: ConstraintId) -> bool {
        for record in &mut self.records {
            if record.constraint == Some(constraint) {
                record.constraint = None;
            }
        }
        self.solver.remove_constraint(constraint)
    }

    pub fn get_connection(&self, item: ItemId, handle: HandleIndex) -> Option<&Connection> {
        self.records
            .iter()
            .find(|c| c.item == item && c.handle == handle)
    }

    /// Query connections, optionally filtered by handle owner and/or connected item
    pub fn get_connections(
        &self,
        item: Option<ItemId>,
        connected: Option<ItemId>,
    ) -> impl Iterator<Item = &Connection> + '_ {
        self.records.iter().filter(move |c| {
            item.is_none_or(|i| c.item == i) && connected.is_none_or(|i| c.connected == i)
        })
    }

    /// Remove every connection involving `item`, on either side
    pub fn remove_connections_to_item(&mut self, item: ItemId) -> Vec<Connection> {
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .records
            .drain(..)
            .partition(|c| c.item == item || c.connected == item);
        self.records = kept;
        for c in &removed {
            if let Some(constraint) = c.constraint {
                self.solver.remove_constraint(constraint);
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
