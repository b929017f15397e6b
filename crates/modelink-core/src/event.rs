//! Revertible events.
//!
//! Every mutation of the [`Model`] records an event in its outbox. An event
//! captures stable ids and indices only, never live references, so it can
//! be serialized into undo history and resolved against the model again at
//! revert time. Reverting applies the inverse mutation, which records the
//! inverse event, so a reverted transaction is itself revertible (redo).

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::trace;

use modelink_geometry::{Connection, HandleIndex, ItemId, PortIndex, Position};

use crate::diagram::{DiagramId, ItemSnapshot};
use crate::element::{ElementId, Value};
use crate::kind::{Kind, Role, serde_kind, serde_role};
use crate::model::Model;

/// A handle attached to a port, by index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleConnection {
    pub item: ItemId,
    pub handle: HandleIndex,
    pub connected: ItemId,
    pub port: PortIndex,
}

impl HandleConnection {
    pub fn new(item: ItemId, handle: HandleIndex, connected: ItemId, port: PortIndex) -> Self {
        Self {
            item,
            handle,
            connected,
            port,
        }
    }
}

impl From<&Connection> for HandleConnection {
    fn from(c: &Connection) -> Self {
        Self::new(c.item, c.handle, c.connected, c.port)
    }
}

/// Geometric connection changes of a line handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// A handle was attached
    Connected(HandleConnection),
    /// A handle was detached
    Disconnected(HandleConnection),
    /// A handle was detached as part of moving it elsewhere
    TemporaryDisconnected(HandleConnection),
    /// A handle moved to another port of the same item; `port` is the prior port
    Reconnected(HandleConnection),
}

impl ConnectionEvent {
    pub fn connection(&self) -> &HandleConnection {
        match self {
            ConnectionEvent::Connected(c)
            | ConnectionEvent::Disconnected(c)
            | ConnectionEvent::TemporaryDisconnected(c)
            | ConnectionEvent::Reconnected(c) => c,
        }
    }

    /// Undo the geometric part of the change.
    ///
    /// Semantic relationships are restored by their own model events.
    pub fn revert(&self, model: &mut Model) -> Result<()> {
        match *self {
            ConnectionEvent::Connected(c) => {
                model
                    .disconnect_handle(c.item, c.handle)
                    .ok_or_else(|| anyhow!("{} of item {} is not connected", c.handle, c.item))?;
                model.emit(ConnectionEvent::Disconnected(c));
            }
            ConnectionEvent::Disconnected(c) => {
                model.connect_handle(c.item, c.handle, c.connected, c.port)?;
                model.emit(ConnectionEvent::Connected(c));
            }
            ConnectionEvent::TemporaryDisconnected(c) => reconnect(model, c)?,
            ConnectionEvent::Reconnected(c) => {
                let current = model
                    .connection(c.item, c.handle)
                    .copied()
                    .ok_or_else(|| anyhow!("{} of item {} is not connected", c.handle, c.item))?;
                if let Some(constraint) = current.constraint {
                    model.remove_constraint(c.item, constraint);
                }
                model.emit(ConnectionEvent::TemporaryDisconnected((&current).into()));
                if current.connected == c.connected {
                    model.reconnect_handle(c.item, c.handle, c.port)?;
                } else {
                    model.disconnect_handle(c.item, c.handle);
                    model.connect_handle(c.item, c.handle, c.connected, c.port)?;
                }
            }
        }
        Ok(())
    }
}

/// Put a handle back on `c.connected`, whatever it is attached to now
fn reconnect(model: &mut Model, c: HandleConnection) -> Result<()> {
    match model.connection(c.item, c.handle).copied() {
        Some(current) if current.connected == c.connected => {
            model.reconnect_handle(c.item, c.handle, c.port)?;
            model.emit(ConnectionEvent::Reconnected(HandleConnection {
                port: current.port,
                ..c
            }));
        }
        Some(current) => {
            model.disconnect_handle(c.item, c.handle);
            model.emit(ConnectionEvent::TemporaryDisconnected((&current).into()));
            model.connect_handle(c.item, c.handle, c.connected, c.port)?;
            model.emit(ConnectionEvent::Connected(c));
        }
        None => {
            model.connect_handle(c.item, c.handle, c.connected, c.port)?;
            model.emit(ConnectionEvent::Connected(c));
        }
    }
    Ok(())
}

/// Any recorded change to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelEvent {
    ElementCreated {
        element: ElementId,
        #[serde(with = "serde_kind")]
        kind: &'static Kind,
    },
    ElementDeleted {
        element: ElementId,
        #[serde(with = "serde_kind")]
        kind: &'static Kind,
        #[serde(default)]
        attributes: BTreeMap<String, Value>,
    },
    AttributeUpdated {
        element: ElementId,
        name: String,
        old: Option<Value>,
        new: Option<Value>,
    },
    /// Single-valued role changed
    AssociationSet {
        element: ElementId,
        #[serde(with = "serde_role")]
        role: &'static Role,
        old: Option<ElementId>,
        new: Option<ElementId>,
    },
    /// Value added to a multi-valued role
    AssociationAdded {
        element: ElementId,
        #[serde(with = "serde_role")]
        role: &'static Role,
        value: ElementId,
    },
    /// Value removed from a multi-valued role
    AssociationDeleted {
        element: ElementId,
        #[serde(with = "serde_role")]
        role: &'static Role,
        value: ElementId,
    },
    DiagramCreated {
        diagram: DiagramId,
        name: String,
        owner: Option<ElementId>,
    },
    DiagramDeleted {
        diagram: DiagramId,
        name: String,
        owner: Option<ElementId>,
    },
    ItemCreated {
        item: ItemId,
        diagram: DiagramId,
        #[serde(with = "serde_kind")]
        kind: &'static Kind,
    },
    ItemDeleted(ItemSnapshot),
    SubjectSet {
        item: ItemId,
        old: Option<ElementId>,
        new: Option<ElementId>,
    },
    HandleMoved {
        item: ItemId,
        handle: HandleIndex,
        old: Position,
        new: Position,
    },
    ItemMoved {
        item: ItemId,
        dx: i32,
        dy: i32,
    },
    Connection(ConnectionEvent),
}

impl From<ConnectionEvent> for ModelEvent {
    fn from(event: ConnectionEvent) -> Self {
        ModelEvent::Connection(event)
    }
}

impl ModelEvent {
    /// Apply the inverse change. The inverse event ends up in the model's outbox.
    pub fn revert(&self, model: &mut Model) -> Result<()> {
        trace!(event = ?self, "revert");
        match self {
            ModelEvent::ElementCreated { element, .. } => model.unlink(*element)?,
            ModelEvent::ElementDeleted {
                element,
                kind,
                attributes,
            } => model.restore_element(*element, *kind, attributes.clone())?,
            ModelEvent::AttributeUpdated { element, name, old, .. } => {
                model.set_attribute(*element, name, old.clone())?;
            }
            ModelEvent::AssociationSet { element, role, old, .. } => model.set_role(*element, *role, *old)?,
            ModelEvent::AssociationAdded { element, role, value } => model.remove_role(*element, *role, *value)?,
            ModelEvent::AssociationDeleted { element, role, value } => model.add_role(*element, *role, *value)?,
            ModelEvent::DiagramCreated { diagram, .. } => model.unlink_diagram(*diagram)?,
            ModelEvent::DiagramDeleted { diagram, name, owner } => {
                model.restore_diagram(*diagram, name.clone(), *owner)?;
            }
            ModelEvent::ItemCreated { item, .. } => model.unlink_item(*item)?,
            ModelEvent::ItemDeleted(snapshot) => model.restore_item(snapshot.clone())?,
            ModelEvent::SubjectSet { item, old, .. } => model.set_subject(*item, *old)?,
            ModelEvent::HandleMoved { item, handle, old, .. } => model.move_handle(*item, *handle, *old)?,
            ModelEvent::ItemMoved { item, dx, dy } => {
                model.move_item(*item, dx.saturating_neg(), dy.saturating_neg())?
            }
            ModelEvent::Connection(event) => event.revert(model)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::*;

    fn line_between() -> (Model, DiagramId, ItemId, ItemId, ItemId) {
        let mut model = Model::new();
        let diagram = model.create_diagram("main", None);
        let a = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        let b = model.create_item(diagram, &CLASS_ITEM, Position::new(300, 0)).unwrap();
        let line = model
            .create_item(diagram, &DEPENDENCY_ITEM, Position::new(100, 20))
            .unwrap();
        model.take_events();
        (model, diagram, a, b, line)
    }

    #[test]
    fn reverting_connected_disconnects_geometry_only() {
        let (mut model, _, a, _, line) = line_between();
        model.connect_handle(line, HandleIndex::HEAD, a, PortIndex(1)).unwrap();
        let event = ConnectionEvent::Connected(HandleConnection::new(line, HandleIndex::HEAD, a, PortIndex(1)));

        event.revert(&mut model).unwrap();
        assert!(model.connection(line, HandleIndex::HEAD).is_none());
        assert_eq!(
            model.take_events(),
            vec![ModelEvent::Connection(ConnectionEvent::Disconnected(*event.connection()))]
        );
    }

    #[test]
    fn reverting_disconnected_reattaches_by_index() {
        let (mut model, _, a, _, line) = line_between();
        let event = ConnectionEvent::Disconnected(HandleConnection::new(line, HandleIndex::TAIL, a, PortIndex(2)));

        event.revert(&mut model).unwrap();
        let c = model.connection(line, HandleIndex::TAIL).unwrap();
        assert_eq!((c.connected, c.port), (a, PortIndex(2)));
    }

    #[test]
    fn reverting_reconnected_restores_prior_port() {
        let (mut model, _, a, _, line) = line_between();
        model.connect_handle(line, HandleIndex::HEAD, a, PortIndex(1)).unwrap();
        model.reconnect_handle(line, HandleIndex::HEAD, PortIndex(3)).unwrap();
        model.take_events();

        let event = ConnectionEvent::Reconnected(HandleConnection::new(line, HandleIndex::HEAD, a, PortIndex(1)));
        event.revert(&mut model).unwrap();

        let c = *model.connection(line, HandleIndex::HEAD).unwrap();
        assert_eq!((c.connected, c.port), (a, PortIndex(1)));
        assert!(c.constraint.is_some());
        assert_eq!(
            model.take_events(),
            vec![ModelEvent::Connection(ConnectionEvent::TemporaryDisconnected(
                HandleConnection::new(line, HandleIndex::HEAD, a, PortIndex(3))
            ))]
        );
    }

    #[test]
    fn temporary_disconnect_revert_undoes_reconnect_revert() {
        let (mut model, _, a, _, line) = line_between();
        model.connect_handle(line, HandleIndex::HEAD, a, PortIndex(1)).unwrap();
        model.reconnect_handle(line, HandleIndex::HEAD, PortIndex(3)).unwrap();
        model.take_events();

        ConnectionEvent::Reconnected(HandleConnection::new(line, HandleIndex::HEAD, a, PortIndex(1)))
            .revert(&mut model)
            .unwrap();
        let redo = model.take_events();
        for event in redo.iter().rev() {
            event.revert(&mut model).unwrap();
        }

        assert_eq!(model.connection(line, HandleIndex::HEAD).unwrap().port, PortIndex(3));
        assert_eq!(
            model.take_events(),
            vec![ModelEvent::Connection(ConnectionEvent::Reconnected(HandleConnection::new(
                line,
                HandleIndex::HEAD,
                a,
                PortIndex(1)
            )))]
        );
    }

    #[test]
    fn temporary_disconnect_moves_handle_back_to_previous_item() {
        let (mut model, _, a, b, line) = line_between();
        model.connect_handle(line, HandleIndex::HEAD, b, PortIndex(3)).unwrap();

        ConnectionEvent::TemporaryDisconnected(HandleConnection::new(line, HandleIndex::HEAD, a, PortIndex(1)))
            .revert(&mut model)
            .unwrap();
        assert_eq!(model.connection(line, HandleIndex::HEAD).unwrap().connected, a);
    }

    #[test]
    fn reverting_unknown_connection_fails() {
        let (mut model, _, a, _, line) = line_between();
        let event = ConnectionEvent::Connected(HandleConnection::new(line, HandleIndex::HEAD, a, PortIndex(1)));
        assert!(event.revert(&mut model).is_err());
    }

    #[test]
    fn events_survive_json() {
        let event = ModelEvent::AssociationSet {
            element: ElementId::new(),
            role: &GENERALIZATION_GENERAL,
            old: None,
            new: Some(ElementId::new()),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Generalization.general"));
        let back: ModelEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
