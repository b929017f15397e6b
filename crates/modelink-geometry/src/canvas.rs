//! The canvas of one diagram: item geometry plus the connection registry.

use anyhow::{Result, anyhow, bail};
use indexmap::IndexMap;

use crate::connections::{Connection, Connections};
use crate::item::{HandleIndex, ItemGeometry, ItemId, PortIndex};
use crate::position::Position;
use crate::solver::ConstraintId;

#[derive(Debug, Default)]
pub struct Canvas {
    items: IndexMap<ItemId, ItemGeometry>,
    connections: Connections,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, id: ItemId, geometry: ItemGeometry) {
        self.items.insert(id, geometry);
    }

    /// Remove an item along with every connection involving it
    pub fn remove_item(&mut self, id: ItemId) -> Option<(ItemGeometry, Vec<Connection>)> {
        let geometry = self.items.shift_remove(&id)?;
        let removed = self.connections.remove_connections_to_item(id);
        Some((geometry, removed))
    }

    pub fn geometry(&self, id: ItemId) -> Option<&ItemGeometry> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.keys().copied()
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Move a handle; constraints touching the item are re-solved lazily
    pub fn set_handle_pos(&mut self, item: ItemId, handle: HandleIndex, pos: Position) -> Result<Position> {
        let geometry = self
            .items
            .get_mut(&item)
            .ok_or_else(|| anyhow!("Unknown item {}", item))?;
        let old = geometry
            .set_handle_pos(handle, pos)
            .ok_or_else(|| anyhow!("Item {} has no {}", item, handle))?;
        self.connections.solver_mut().request_resolve(item);
        Ok(old)
    }

    /// Translate an item by delta
    pub fn translate_item(&mut self, item: ItemId, dx: i32, dy: i32) -> Result<()> {
        let geometry = self
            .items
            .get_mut(&item)
            .ok_or_else(|| anyhow!("Unknown item {}", item))?;
        geometry.translate(dx, dy);
        self.connections.solver_mut().request_resolve(item);
        Ok(())
    }

    /// Attach a handle to a port, adding a constraint for it
    pub fn connect(
        &mut self,
        item: ItemId,
        handle: HandleIndex,
        connected: ItemId,
        port: PortIndex,
    ) -> Result<ConstraintId> {
        self.check_handle(item, handle)?;
        self.check_port(connected, port)?;
        self.connections.connect_item(item, handle, connected, port)
    }

    pub fn disconnect(&mut self, item: ItemId, handle: HandleIndex) -> Option<Connection> {
        self.connections.disconnect_item(item, handle)
    }

    /// Move an existing connection to another port of the same connected item
    pub fn reconnect(&mut self, item: ItemId, handle: HandleIndex, port: PortIndex) -> Result<ConstraintId> {
        let connected = self
            .connections
            .get_connection(item, handle)
            .map(|c| c.connected)
            .ok_or_else(|| anyhow!("{} of item {} is not connected", handle, item))?;
        self.check_port(connected, port)?;
        self.connections.reconnect_item(item, handle, port)
    }

    pub fn remove_constraint(&mut self, constraint: ConstraintId) -> bool {
        self.connections.remove_constraint(constraint)
    }

    pub fn get_connection(&self, item: ItemId, handle: HandleIndex) -> Option<&Connection> {
        self.connections.get_connection(item, handle)
    }

    pub fn get_connections(
        &self,
        item: Option<ItemId>,
        connected: Option<ItemId>,
    ) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.get_connections(item, connected)
    }

    /// Settle pending constraints
    pub fn solve(&mut self) {
        let Self { items, connections } = self;
        connections.solver_mut().solve(items);
    }

    /// Port of `target` closest to `pos`
    pub fn nearest_port(&self, target: ItemId, pos: Position) -> Option<(PortIndex, Position, f64)> {
        self.items.get(&target)?.nearest_port(pos)
    }

    fn check_handle(&self, item: ItemId, handle: HandleIndex) -> Result<()> {
        let geometry = self
            .items
            .get(&item)
            .ok_or_else(|| anyhow!("Unknown item {}", item))?;
        match geometry.handle(handle) {
            Some(h) if h.connectable => Ok(()),
            Some(_) => bail!("{} of item {} is not connectable", handle, item),
            None => bail!("Item {} has no {}", item, handle),
        }
    }

    fn check_port(&self, item: ItemId, port: PortIndex) -> Result<()> {
        let geometry = self
            .items
            .get(&item)
            .ok_or_else(|| anyhow!("Unknown item {}", item))?;
        if port.0 >= geometry.ports().len() {
            bail!("Item {} has no {}", item, port);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> (Canvas, ItemId, ItemId) {
        let mut canvas = Canvas::new();
        let element = ItemId::new();
        let line = ItemId::new();
        canvas.add_item(element, ItemGeometry::element(Position::new(0, 0), 100, 50));
        canvas.add_item(line, ItemGeometry::line(Position::new(120, 20), Position::new(300, 20)));
        (canvas, element, line)
    }

    #[test]
    fn connect_and_solve_snaps_handle() {
        let (mut canvas, element, line) = canvas();
        canvas.connect(line, HandleIndex::HEAD, element, PortIndex(1)).unwrap();
        canvas.solve();
        assert_eq!(
            canvas.geometry(line).unwrap().handles()[0].pos,
            Position::new(100, 20)
        );
    }

    #[test]
    fn element_handles_are_not_connectable() {
        let (mut canvas, element, line) = canvas();
        assert!(canvas.connect(element, HandleIndex(0), line, PortIndex(0)).is_err());
    }

    #[test]
    fn unknown_port_is_rejected() {
        let (mut canvas, element, line) = canvas();
        assert!(canvas.connect(line, HandleIndex::HEAD, element, PortIndex(9)).is_err());
    }

    #[test]
    fn moving_element_drags_connected_line_end() {
        let (mut canvas, element, line) = canvas();
        canvas.connect(line, HandleIndex::HEAD, element, PortIndex(1)).unwrap();
        canvas.solve();
        canvas.translate_item(element, 10, 0).unwrap();
        canvas.solve();
        assert_eq!(
            canvas.geometry(line).unwrap().handles()[0].pos,
            Position::new(110, 20)
        );
    }

    #[test]
    fn remove_item_drops_its_connections() {
        let (mut canvas, element, line) = canvas();
        canvas.connect(line, HandleIndex::HEAD, element, PortIndex(1)).unwrap();
        let (_, removed) = canvas.remove_item(element).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(canvas.get_connection(line, HandleIndex::HEAD).is_none());
        assert!(!canvas.contains(element));
    }
}
