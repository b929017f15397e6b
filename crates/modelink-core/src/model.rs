//! The model repository.
//!
//! Owns every element, diagram and presentation item of one document.
//! Each mutation records a [`ModelEvent`] in an outbox which the undo layer
//! drains into transactions. Geometric connection helpers
//! (`connect_handle` and friends) are the exception: they are silent, and
//! the connection tool records the matching [`ConnectionEvent`] itself.

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Result, anyhow, ensure};
use indexmap::IndexMap;
use tracing::{debug, warn};

use modelink_geometry::item::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use modelink_geometry::{Canvas, Connection, ConstraintId, HandleIndex, ItemGeometry, ItemId, PortIndex, Position};

use crate::diagram::{Diagram, DiagramId, DiagramView, Item, ItemSnapshot};
use crate::element::{Element, ElementId, Value};
use crate::event::{ConnectionEvent, ModelEvent};
use crate::kind::{Kind, Role};
use crate::metamodel::{self, LINE_PRESENTATION, PRESENTATION};

/// Runs before [`Model::unlink`] or [`Model::unlink_diagram`] removes an
/// item, while the item's connections are still in place.
///
/// The connection layer installs one so that removing an element or a
/// diagram disconnects lines the same way dragging them off would.
pub trait UnlinkHook: std::fmt::Debug {
    fn unlinking(&self, model: &mut Model, item: ItemId) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct Model {
    elements: IndexMap<ElementId, Element>,
    diagrams: IndexMap<DiagramId, Diagram>,
    items: IndexMap<ItemId, Item>,
    events: Vec<ModelEvent>,
    unlink_hook: Option<Rc<dyn UnlinkHook>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unlink_hook(&mut self, hook: Option<Rc<dyn UnlinkHook>>) {
        self.unlink_hook = hook;
    }

    // ========== Elements ==========

    /// Create a model element of `kind`
    pub fn create(&mut self, kind: &'static Kind) -> Result<ElementId> {
        ensure!(!kind.is_a(&PRESENTATION), "{} is a diagram item kind", kind);
        let id = ElementId::new();
        self.insert_element(Element::new(id, kind));
        Ok(id)
    }

    /// Recreate a deleted element under its old id
    pub fn restore_element(
        &mut self,
        id: ElementId,
        kind: &'static Kind,
        attributes: BTreeMap<String, Value>,
    ) -> Result<()> {
        ensure!(!self.elements.contains_key(&id), "Element {} already exists", id);
        let mut element = Element::new(id, kind);
        element.attributes = attributes;
        self.insert_element(element);
        Ok(())
    }

    fn insert_element(&mut self, element: Element) {
        let (id, kind) = (element.id(), element.kind());
        self.elements.insert(id, element);
        debug!(%id, %kind, "element created");
        self.emit(ModelEvent::ElementCreated { element: id, kind });
    }

    pub fn lookup(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements.get(&id).ok_or_else(|| anyhow!("Unknown element {}", id))
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.elements.get_mut(&id).ok_or_else(|| anyhow!("Unknown element {}", id))
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.elements.values()
    }

    pub fn kind_of(&self, id: ElementId) -> Option<&'static Kind> {
        self.elements.get(&id).map(Element::kind)
    }

    /// Elements of `kind` or any of its descendants
    pub fn select(&self, kind: &'static Kind) -> impl Iterator<Item = &Element> + '_ {
        self.elements.values().filter(move |e| e.kind().is_a(kind))
    }

    /// Set or clear an attribute
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: Option<Value>) -> Result<()> {
        let element = self.element_mut(id)?;
        let old = match &value {
            Some(v) => element.attributes.insert(name.to_string(), v.clone()),
            None => element.attributes.remove(name),
        };
        if old != value {
            self.emit(ModelEvent::AttributeUpdated {
                element: id,
                name: name.to_string(),
                old,
                new: value,
            });
        }
        Ok(())
    }

    // ========== Roles ==========

    /// Current values of a role (at most one for single-valued roles)
    pub fn role_values(&self, element: ElementId, role: &Role) -> &[ElementId] {
        self.elements
            .get(&element)
            .map(|e| e.references(role.name))
            .unwrap_or(&[])
    }

    pub fn role_value(&self, element: ElementId, role: &Role) -> Option<ElementId> {
        self.role_values(element, role).first().copied()
    }

    /// Whether a role holds `value`: equality for single roles, membership for many
    pub fn role_matches(&self, element: ElementId, role: &Role, value: Option<ElementId>) -> bool {
        let values = self.role_values(element, role);
        match (role.many, value) {
            (true, Some(v)) => values.contains(&v),
            (true, None) => values.is_empty(),
            (false, v) => values.first().copied() == v,
        }
    }

    /// Elements referring to `element` through roles whose opposite is `opposite`
    pub fn opposites(&self, element: ElementId, opposite: &str) -> &[ElementId] {
        self.elements
            .get(&element)
            .map(|e| e.opposites(opposite))
            .unwrap_or(&[])
    }

    fn check_role(&self, element: ElementId, role: &'static Role, value: Option<ElementId>) -> Result<()> {
        let kind = self.element(element)?.kind();
        ensure!(kind.is_a(role.owner), "{} has no role {}", kind, role);
        if let Some(value) = value {
            let target = self.element(value)?.kind();
            ensure!(target.is_a(role.target), "{} can not be {} of a {}", target, role, kind);
        }
        Ok(())
    }

    /// Assign a single-valued role
    pub fn set_role(&mut self, element: ElementId, role: &'static Role, value: Option<ElementId>) -> Result<()> {
        ensure!(!role.many, "{} is multi-valued", role);
        self.check_role(element, role, value)?;
        let old = self.role_value(element, role);
        if old == value {
            return Ok(());
        }
        let values = self.element_mut(element)?.references.entry(role.name).or_default();
        values.clear();
        values.extend(value);
        if let Some(old) = old {
            self.unlink_opposite(role, old, element);
        }
        if let Some(new) = value {
            self.link_opposite(role, new, element);
        }
        self.emit(ModelEvent::AssociationSet {
            element,
            role,
            old,
            new: value,
        });
        Ok(())
    }

    /// Add a value to a multi-valued role
    pub fn add_role(&mut self, element: ElementId, role: &'static Role, value: ElementId) -> Result<()> {
        ensure!(role.many, "{} is single-valued", role);
        self.check_role(element, role, Some(value))?;
        let values = self.element_mut(element)?.references.entry(role.name).or_default();
        if values.contains(&value) {
            return Ok(());
        }
        values.push(value);
        self.link_opposite(role, value, element);
        self.emit(ModelEvent::AssociationAdded { element, role, value });
        Ok(())
    }

    /// Remove a value from a multi-valued role
    pub fn remove_role(&mut self, element: ElementId, role: &'static Role, value: ElementId) -> Result<()> {
        ensure!(role.many, "{} is single-valued", role);
        let Some(values) = self.element_mut(element)?.references.get_mut(role.name) else {
            return Ok(());
        };
        let Some(index) = values.iter().position(|v| *v == value) else {
            return Ok(());
        };
        values.remove(index);
        self.unlink_opposite(role, value, element);
        self.emit(ModelEvent::AssociationDeleted { element, role, value });
        Ok(())
    }

    /// Make `value` the only value of a role, whatever its multiplicity
    pub fn replace_role(&mut self, element: ElementId, role: &'static Role, value: Option<ElementId>) -> Result<()> {
        if !role.many {
            return self.set_role(element, role, value);
        }
        let stale: Vec<_> = self
            .role_values(element, role)
            .iter()
            .copied()
            .filter(|v| Some(*v) != value)
            .collect();
        for v in stale {
            self.remove_role(element, role, v)?;
        }
        if let Some(value) = value {
            self.add_role(element, role, value)?;
        }
        Ok(())
    }

    /// Drop one reference regardless of multiplicity
    fn detach(&mut self, element: ElementId, role: &'static Role, value: ElementId) -> Result<()> {
        if role.many {
            self.remove_role(element, role, value)
        } else if self.role_value(element, role) == Some(value) {
            self.set_role(element, role, None)
        } else {
            Ok(())
        }
    }

    fn link_opposite(&mut self, role: &Role, target: ElementId, source: ElementId) {
        let Some(opposite) = role.opposite else { return };
        if let Some(target) = self.elements.get_mut(&target) {
            let values = target.opposites.entry(opposite).or_default();
            if !values.contains(&source) {
                values.push(source);
            }
        }
    }

    fn unlink_opposite(&mut self, role: &Role, target: ElementId, source: ElementId) {
        let Some(opposite) = role.opposite else { return };
        if let Some(target) = self.elements.get_mut(&target) {
            if let Some(values) = target.opposites.get_mut(opposite) {
                values.retain(|v| *v != source);
            }
        }
    }

    /// Delete an element: its presentations go first, then every reference
    /// to or from it, then the element itself.
    pub fn unlink(&mut self, id: ElementId) -> Result<()> {
        let element = self.element(id)?;
        let kind = element.kind();
        let presentation = element.presentation.clone();
        let own: Vec<(&'static str, Vec<ElementId>)> = element
            .references
            .iter()
            .map(|(name, values)| (*name, values.clone()))
            .collect();

        for item in presentation {
            if self.items.contains_key(&item) {
                self.unlink_presentation(item)?;
            }
        }

        let referrers: Vec<(ElementId, &'static Kind, &'static str)> = self
            .elements
            .values()
            .filter(|e| e.id() != id)
            .flat_map(|e| {
                e.references
                    .iter()
                    .filter(|(_, values)| values.contains(&id))
                    .map(move |(name, _)| (e.id(), e.kind(), *name))
            })
            .collect();
        for (other, other_kind, name) in referrers {
            let role = metamodel::role(other_kind, name)
                .ok_or_else(|| anyhow!("{} has no role {}", other_kind, name))?;
            self.detach(other, role, id)?;
        }

        for (name, values) in own {
            let role = metamodel::role(kind, name).ok_or_else(|| anyhow!("{} has no role {}", kind, name))?;
            for value in values {
                self.detach(id, role, value)?;
            }
        }

        let element = self
            .elements
            .shift_remove(&id)
            .ok_or_else(|| anyhow!("Unknown element {}", id))?;
        debug!(%id, %kind, "element unlinked");
        self.emit(ModelEvent::ElementDeleted {
            element: id,
            kind,
            attributes: element.attributes,
        });
        Ok(())
    }

    // ========== Diagrams ==========

    pub fn create_diagram(&mut self, name: impl Into<String>, owner: Option<ElementId>) -> DiagramId {
        let id = DiagramId::new();
        self.insert_diagram(Diagram::new(id, name.into(), owner));
        id
    }

    pub fn restore_diagram(&mut self, id: DiagramId, name: String, owner: Option<ElementId>) -> Result<()> {
        ensure!(!self.diagrams.contains_key(&id), "Diagram {} already exists", id);
        self.insert_diagram(Diagram::new(id, name, owner));
        Ok(())
    }

    fn insert_diagram(&mut self, diagram: Diagram) {
        let event = ModelEvent::DiagramCreated {
            diagram: diagram.id(),
            name: diagram.name.clone(),
            owner: diagram.owner,
        };
        self.diagrams.insert(diagram.id(), diagram);
        self.emit(event);
    }

    pub fn diagram(&self, id: DiagramId) -> Option<&Diagram> {
        self.diagrams.get(&id)
    }

    fn diagram_mut(&mut self, id: DiagramId) -> Result<&mut Diagram> {
        self.diagrams.get_mut(&id).ok_or_else(|| anyhow!("Unknown diagram {}", id))
    }

    pub fn diagrams(&self) -> impl Iterator<Item = &Diagram> + '_ {
        self.diagrams.values()
    }

    /// Attach an observer to a diagram
    pub fn register_view(&mut self, diagram: DiagramId, view: Box<dyn DiagramView>) -> Result<()> {
        self.diagram_mut(diagram)?.views.push(view);
        Ok(())
    }

    /// Delete a diagram after unlinking every item on it
    pub fn unlink_diagram(&mut self, id: DiagramId) -> Result<()> {
        for item in self.diagram_items(id) {
            if self.items.contains_key(&item) {
                self.unlink_presentation(item)?;
            }
        }
        let diagram = self
            .diagrams
            .shift_remove(&id)
            .ok_or_else(|| anyhow!("Unknown diagram {}", id))?;
        debug!(%id, name = %diagram.name, "diagram unlinked");
        self.emit(ModelEvent::DiagramDeleted {
            diagram: id,
            name: diagram.name,
            owner: diagram.owner,
        });
        Ok(())
    }

    // ========== Items ==========

    /// Create a presentation item with default geometry at `origin`
    pub fn create_item(&mut self, diagram: DiagramId, kind: &'static Kind, origin: Position) -> Result<ItemId> {
        let geometry = if kind.is_a(&LINE_PRESENTATION) {
            ItemGeometry::line(origin, origin.translated(DEFAULT_WIDTH, 0))
        } else {
            ItemGeometry::element(origin, DEFAULT_WIDTH, DEFAULT_HEIGHT)
        };
        self.create_item_with(diagram, kind, geometry)
    }

    pub fn create_item_with(
        &mut self,
        diagram: DiagramId,
        kind: &'static Kind,
        geometry: ItemGeometry,
    ) -> Result<ItemId> {
        let id = ItemId::new();
        self.insert_item(id, diagram, kind, geometry)?;
        Ok(id)
    }

    /// Put an unlinked item back on its diagram, without subject or connections
    pub fn restore_item(&mut self, snapshot: ItemSnapshot) -> Result<()> {
        ensure!(!self.items.contains_key(&snapshot.id), "Item {} already exists", snapshot.id);
        self.insert_item(snapshot.id, snapshot.diagram, snapshot.kind, snapshot.geometry)
    }

    fn insert_item(&mut self, id: ItemId, diagram_id: DiagramId, kind: &'static Kind, geometry: ItemGeometry) -> Result<()> {
        ensure!(kind.is_a(&PRESENTATION), "{} is not a presentation kind", kind);
        ensure!(
            kind.is_a(&LINE_PRESENTATION) == geometry.is_line(),
            "Geometry does not fit a {}",
            kind
        );
        let diagram = self.diagram_mut(diagram_id)?;
        diagram.canvas.add_item(id, geometry);
        diagram.items.push(id);
        diagram.notify(&[id], &[]);
        self.items.insert(id, Item::new(id, kind, diagram_id));
        debug!(item = %id, %kind, diagram = %diagram_id, "item created");
        self.emit(ModelEvent::ItemCreated {
            item: id,
            diagram: diagram_id,
            kind,
        });
        Ok(())
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    fn item_ref(&self, id: ItemId) -> Result<&Item> {
        self.items.get(&id).ok_or_else(|| anyhow!("Unknown item {}", id))
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.values()
    }

    pub fn item_kind(&self, id: ItemId) -> Option<&'static Kind> {
        self.items.get(&id).map(Item::kind)
    }

    pub fn subject(&self, item: ItemId) -> Option<ElementId> {
        self.items.get(&item).and_then(Item::subject)
    }

    /// Items of a diagram, element presentations first and lines last
    pub fn diagram_items(&self, diagram: DiagramId) -> Vec<ItemId> {
        let Some(diagram) = self.diagrams.get(&diagram) else {
            return Vec::new();
        };
        let (lines, elements): (Vec<ItemId>, Vec<ItemId>) = diagram
            .items
            .iter()
            .copied()
            .partition(|id| self.items.get(id).is_some_and(Item::is_line));
        elements.into_iter().chain(lines).collect()
    }

    /// Point an item at a model element, or clear it
    pub fn set_subject(&mut self, item: ItemId, subject: Option<ElementId>) -> Result<()> {
        if let Some(subject) = subject {
            self.element(subject)?;
        }
        let entry = self.items.get_mut(&item).ok_or_else(|| anyhow!("Unknown item {}", item))?;
        let old = std::mem::replace(&mut entry.subject, subject);
        if old == subject {
            return Ok(());
        }
        if let Some(old) = old.and_then(|id| self.elements.get_mut(&id)) {
            old.presentation.retain(|i| *i != item);
        }
        if let Some(new) = subject.and_then(|id| self.elements.get_mut(&id)) {
            new.presentation.push(item);
        }
        self.emit(ModelEvent::SubjectSet { item, old, new: subject });
        Ok(())
    }

    /// Flag an item as being unlinked; its diagram reads as `None` from now on
    pub fn begin_unlink(&mut self, item: ItemId) -> Result<()> {
        self.items
            .get_mut(&item)
            .ok_or_else(|| anyhow!("Unknown item {}", item))?
            .unlinking = true;
        Ok(())
    }

    /// Unlink an item on behalf of an element or diagram going away
    fn unlink_presentation(&mut self, item: ItemId) -> Result<()> {
        if let Some(hook) = self.unlink_hook.clone() {
            self.begin_unlink(item)?;
            hook.unlinking(self, item)?;
        }
        self.unlink_item(item)
    }

    /// Remove an item from its diagram.
    ///
    /// Its subject is cleared and every connection involving it is dropped;
    /// views of the diagram learn about the removal.
    pub fn unlink_item(&mut self, id: ItemId) -> Result<()> {
        self.begin_unlink(id)?;
        let item = self.item_ref(id)?;
        let (diagram_id, kind) = (item.canvas_diagram(), item.kind());
        self.set_subject(id, None)?;

        let diagram = self.diagram_mut(diagram_id)?;
        let (geometry, removed) = diagram
            .canvas
            .remove_item(id)
            .ok_or_else(|| anyhow!("Item {} is not on diagram {}", id, diagram_id))?;
        diagram.items.retain(|i| *i != id);
        let updated: Vec<ItemId> = removed
            .iter()
            .map(|c| if c.item == id { c.connected } else { c.item })
            .collect();
        diagram.notify(&updated, &[id]);
        self.items.shift_remove(&id);

        debug!(item = %id, %kind, connections = removed.len(), "item unlinked");
        for c in &removed {
            self.emit(ConnectionEvent::Disconnected(c.into()));
        }
        self.emit(ModelEvent::ItemDeleted(ItemSnapshot {
            id,
            diagram: diagram_id,
            kind,
            geometry,
        }));
        Ok(())
    }

    // ========== Geometry ==========

    fn canvas(&self, item: ItemId) -> Option<&Canvas> {
        let diagram = self.items.get(&item)?.canvas_diagram();
        self.diagrams.get(&diagram).map(Diagram::canvas)
    }

    fn canvas_mut(&mut self, item: ItemId) -> Result<&mut Canvas> {
        let diagram = self.item_ref(item)?.canvas_diagram();
        Ok(&mut self.diagram_mut(diagram)?.canvas)
    }

    pub fn geometry(&self, item: ItemId) -> Option<&ItemGeometry> {
        self.canvas(item)?.geometry(item)
    }

    /// The other end of a line
    pub fn opposite(&self, item: ItemId, handle: HandleIndex) -> Option<HandleIndex> {
        self.geometry(item).map(|g| g.opposite(handle))
    }

    pub fn move_handle(&mut self, item: ItemId, handle: HandleIndex, pos: Position) -> Result<()> {
        let old = self.canvas_mut(item)?.set_handle_pos(item, handle, pos)?;
        if old != pos {
            self.emit(ModelEvent::HandleMoved {
                item,
                handle,
                old,
                new: pos,
            });
        }
        Ok(())
    }

    pub fn move_item(&mut self, item: ItemId, dx: i32, dy: i32) -> Result<()> {
        self.canvas_mut(item)?.translate_item(item, dx, dy)?;
        if dx != 0 || dy != 0 {
            self.emit(ModelEvent::ItemMoved { item, dx, dy });
        }
        Ok(())
    }

    /// Record a geometric connection
    pub fn connect_handle(
        &mut self,
        item: ItemId,
        handle: HandleIndex,
        connected: ItemId,
        port: PortIndex,
    ) -> Result<ConstraintId> {
        let diagram = self.item_ref(item)?.canvas_diagram();
        let other = self.item_ref(connected)?.canvas_diagram();
        ensure!(
            diagram == other,
            "Items {} and {} are on different diagrams",
            item,
            connected
        );
        let d = self.diagram_mut(diagram)?;
        let constraint = d.canvas.connect(item, handle, connected, port)?;
        d.notify(&[item], &[]);
        Ok(constraint)
    }

    /// Drop a geometric connection
    pub fn disconnect_handle(&mut self, item: ItemId, handle: HandleIndex) -> Option<Connection> {
        let diagram = self.items.get(&item)?.canvas_diagram();
        let d = self.diagrams.get_mut(&diagram)?;
        let removed = d.canvas.disconnect(item, handle)?;
        d.notify(&[item], &[]);
        Some(removed)
    }

    /// Move a connected handle to another port of the same item
    pub fn reconnect_handle(&mut self, item: ItemId, handle: HandleIndex, port: PortIndex) -> Result<ConstraintId> {
        self.canvas_mut(item)?.reconnect(item, handle, port)
    }

    pub fn remove_constraint(&mut self, item: ItemId, constraint: ConstraintId) -> bool {
        match self.canvas_mut(item) {
            Ok(canvas) => canvas.remove_constraint(constraint),
            Err(err) => {
                warn!(%item, "can not remove constraint: {:#}", err);
                false
            }
        }
    }

    pub fn connection(&self, item: ItemId, handle: HandleIndex) -> Option<&Connection> {
        self.canvas(item)?.get_connection(item, handle)
    }

    /// Connections whose handle belongs to `item`
    pub fn connections_of(&self, item: ItemId) -> Vec<Connection> {
        self.canvas(item)
            .map(|c| c.get_connections(Some(item), None).copied().collect())
            .unwrap_or_default()
    }

    /// Connections attached to a port of `connected`
    pub fn connections_to(&self, connected: ItemId) -> Vec<Connection> {
        self.canvas(connected)
            .map(|c| c.get_connections(None, Some(connected)).copied().collect())
            .unwrap_or_default()
    }

    /// Settle pending constraints on the canvas holding `item`
    pub fn solve(&mut self, item: ItemId) {
        if let Ok(canvas) = self.canvas_mut(item) {
            canvas.solve();
        }
    }

    // ========== Events ==========

    pub fn emit(&mut self, event: impl Into<ModelEvent>) {
        self.events.push(event.into());
    }

    pub fn events(&self) -> &[ModelEvent] {
        &self.events
    }

    /// Drain the outbox
    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::metamodel::*;

    #[derive(Default, Clone)]
    struct RecordingView {
        removed: Rc<RefCell<Vec<ItemId>>>,
    }

    impl DiagramView for RecordingView {
        fn request_update(&mut self, _updated: &[ItemId], removed: &[ItemId]) {
            self.removed.borrow_mut().extend_from_slice(removed);
        }
    }

    fn undo(model: &mut Model, events: Vec<ModelEvent>) {
        for event in events.iter().rev() {
            event.revert(model).unwrap();
        }
    }

    #[test]
    fn only_presentation_kinds_become_items() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        assert!(model.create_item(diagram, &CLASS, Position::new(0, 0)).is_err());
        assert!(model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).is_ok());
        assert!(model.create(&CLASS_ITEM).is_err());
    }

    #[test]
    fn lines_are_listed_last() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let line = model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(0, 0)).unwrap();
        let class = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        assert_eq!(model.diagram_items(diagram), vec![class, line]);
        assert_eq!(model.diagram(diagram).unwrap().items(), &[line, class]);
    }

    #[test]
    fn unlinking_diagram_unlinks_items_first() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let class = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        let line = model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(0, 0)).unwrap();
        model.take_events();

        model.unlink_diagram(diagram).unwrap();
        assert!(model.item(class).is_none());
        assert!(model.item(line).is_none());
        assert!(model.diagram(diagram).is_none());

        let events = model.take_events();
        assert!(matches!(events.last(), Some(ModelEvent::DiagramDeleted { .. })));
        let deleted: Vec<ItemId> = events
            .iter()
            .filter_map(|e| match e {
                ModelEvent::ItemDeleted(s) => Some(s.id),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, vec![class, line]);
    }

    /// Records the items it is called for and whether they were still connected
    #[derive(Debug, Default)]
    struct RecordingHook {
        calls: RefCell<Vec<(ItemId, bool)>>,
    }

    impl UnlinkHook for RecordingHook {
        fn unlinking(&self, model: &mut Model, item: ItemId) -> Result<()> {
            assert!(model.item(item).unwrap().diagram().is_none());
            let connected = !model.connections_to(item).is_empty() || !model.connections_of(item).is_empty();
            self.calls.borrow_mut().push((item, connected));
            Ok(())
        }
    }

    #[test]
    fn unlink_hook_runs_before_connections_drop() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let class = model.create(&CLASS).unwrap();
        let shown = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        model.set_subject(shown, Some(class)).unwrap();
        let line = model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(0, 0)).unwrap();
        model.connect_handle(line, HandleIndex::HEAD, shown, PortIndex(0)).unwrap();

        let hook = Rc::new(RecordingHook::default());
        model.set_unlink_hook(Some(hook.clone()));

        model.unlink(class).unwrap();
        assert_eq!(*hook.calls.borrow(), vec![(shown, true)]);
        assert!(model.connection(line, HandleIndex::HEAD).is_none());

        // plain item unlinks leave the hook alone
        model.unlink_item(line).unwrap();
        assert_eq!(hook.calls.borrow().len(), 1);
    }

    #[test]
    fn unlink_hook_sees_every_diagram_item() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let line = model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(0, 0)).unwrap();
        let class = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        let hook = Rc::new(RecordingHook::default());
        model.set_unlink_hook(Some(hook.clone()));

        model.unlink_diagram(diagram).unwrap();
        let seen: Vec<ItemId> = hook.calls.borrow().iter().map(|(item, _)| *item).collect();
        assert_eq!(seen, vec![class, line]);
    }

    #[test]
    fn unlinking_item_drops_connections_and_notifies_views() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let class = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        let line = model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(0, 0)).unwrap();
        model.connect_handle(line, HandleIndex::HEAD, class, PortIndex(0)).unwrap();
        let view = RecordingView::default();
        model.register_view(diagram, Box::new(view.clone())).unwrap();

        model.unlink_item(class).unwrap();
        assert!(model.connection(line, HandleIndex::HEAD).is_none());
        assert_eq!(*view.removed.borrow(), vec![class]);
        assert!(
            model
                .events()
                .iter()
                .any(|e| matches!(e, ModelEvent::Connection(ConnectionEvent::Disconnected(c)) if c.connected == class))
        );
    }

    #[test]
    fn unlinked_item_can_be_restored_with_its_connections() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let class = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        let line = model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(0, 0)).unwrap();
        let subject = model.create(&CLASS).unwrap();
        model.set_subject(class, Some(subject)).unwrap();
        model.connect_handle(line, HandleIndex::HEAD, class, PortIndex(0)).unwrap();
        model.take_events();

        model.unlink_item(class).unwrap();
        let events = model.take_events();
        undo(&mut model, events);

        assert_eq!(model.subject(class), Some(subject));
        assert_eq!(model.connection(line, HandleIndex::HEAD).unwrap().connected, class);
        assert_eq!(model.element(subject).unwrap().presentation(), &[class]);
    }

    #[test]
    fn roles_maintain_opposites() {
        let mut model = Model::new();
        let supplier = model.create(&CLASS).unwrap();
        let client = model.create(&CLASS).unwrap();
        let dependency = model.create(&DEPENDENCY).unwrap();

        model.add_role(dependency, &DEPENDENCY_SUPPLIER, supplier).unwrap();
        model.add_role(dependency, &DEPENDENCY_CLIENT, client).unwrap();
        assert_eq!(model.opposites(client, "client_dependency"), &[dependency]);
        assert_eq!(model.opposites(supplier, "supplier_dependency"), &[dependency]);
        assert!(model.role_matches(dependency, &DEPENDENCY_SUPPLIER, Some(supplier)));
        assert!(!model.role_matches(dependency, &DEPENDENCY_SUPPLIER, Some(client)));

        model.replace_role(dependency, &DEPENDENCY_CLIENT, Some(supplier)).unwrap();
        assert!(model.opposites(client, "client_dependency").is_empty());
        assert_eq!(model.role_values(dependency, &DEPENDENCY_CLIENT), &[supplier]);
    }

    #[test]
    fn single_role_replaces_previous_value() {
        let mut model = Model::new();
        let general = model.create(&CLASS).unwrap();
        let other = model.create(&CLASS).unwrap();
        let specific = model.create(&CLASS).unwrap();
        let generalization = model.create(&GENERALIZATION).unwrap();

        model.set_role(generalization, &GENERALIZATION_SPECIFIC, Some(specific)).unwrap();
        model.set_role(generalization, &GENERALIZATION_SPECIFIC, Some(other)).unwrap();
        assert!(model.opposites(specific, "generalization").is_empty());
        assert_eq!(model.opposites(other, "generalization"), &[generalization]);
        assert!(model.role_matches(generalization, &GENERALIZATION_GENERAL, None));
        model.set_role(generalization, &GENERALIZATION_GENERAL, Some(general)).unwrap();
        assert!(model.role_matches(generalization, &GENERALIZATION_GENERAL, Some(general)));
    }

    #[test]
    fn role_targets_are_type_checked() {
        let mut model = Model::new();
        let comment = model.create(&COMMENT).unwrap();
        let dependency = model.create(&DEPENDENCY).unwrap();
        assert!(model.add_role(dependency, &DEPENDENCY_SUPPLIER, comment).is_err());
        assert!(model.set_role(comment, &GENERALIZATION_GENERAL, None).is_err());
        assert!(model.set_role(dependency, &DEPENDENCY_SUPPLIER, None).is_err());
    }

    #[test]
    fn unlinking_element_detaches_everything() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let supplier = model.create(&CLASS).unwrap();
        let client = model.create(&CLASS).unwrap();
        let dependency = model.create(&DEPENDENCY).unwrap();
        model.add_role(dependency, &DEPENDENCY_SUPPLIER, supplier).unwrap();
        model.add_role(dependency, &DEPENDENCY_CLIENT, client).unwrap();
        let item = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        model.set_subject(item, Some(supplier)).unwrap();

        model.unlink(supplier).unwrap();
        assert!(model.lookup(supplier).is_none());
        assert!(model.item(item).is_none());
        assert!(model.role_values(dependency, &DEPENDENCY_SUPPLIER).is_empty());
        assert_eq!(model.role_values(dependency, &DEPENDENCY_CLIENT), &[client]);
        assert!(matches!(
            model.events().last(),
            Some(ModelEvent::ElementDeleted { element, .. }) if *element == supplier
        ));
    }

    #[test]
    fn reverting_events_restores_model() {
        let mut model = Model::new();
        let supplier = model.create(&CLASS).unwrap();
        let client = model.create(&CLASS).unwrap();
        model.take_events();

        let dependency = model.create(&DEPENDENCY).unwrap();
        model.set_attribute(dependency, "name", Some("uses".into())).unwrap();
        model.add_role(dependency, &DEPENDENCY_SUPPLIER, supplier).unwrap();
        model.add_role(dependency, &DEPENDENCY_CLIENT, client).unwrap();
        let events = model.take_events();
        undo(&mut model, events);

        assert!(model.lookup(dependency).is_none());
        assert!(model.opposites(client, "client_dependency").is_empty());

        let redo = model.take_events();
        undo(&mut model, redo);
        let restored = model.element(dependency).unwrap();
        assert_eq!(restored.name(), Some("uses"));
        assert_eq!(model.opposites(client, "client_dependency"), &[dependency]);
    }

    #[test]
    fn moves_are_recorded_and_revertible() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let line = model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(0, 0)).unwrap();
        model.take_events();

        model.move_handle(line, HandleIndex::TAIL, Position::new(40, 40)).unwrap();
        model.move_item(line, 5, 0).unwrap();
        let events = model.take_events();
        assert_eq!(events.len(), 2);
        undo(&mut model, events);
        assert_eq!(
            model.geometry(line).unwrap().handle(HandleIndex::TAIL).unwrap().pos,
            Position::new(DEFAULT_WIDTH, 0)
        );
    }
}
