//! The connector contract plus the base and forbidding connectors.

use modelink_core::{DiagramId, Item, Model};
use modelink_geometry::{HandleIndex, ItemId, PortIndex};

use crate::context::ConnectContext;

/// Connection behaviour between one connectable item (`element`) and one
/// line whose handle attaches to it.
///
/// Connectors are built per operation from the current model state and
/// hold ids only, never borrows of the model.
pub trait Connector {
    /// Whether the handle may attach to the port. Called while dragging,
    /// so it only reads the model.
    fn allow(&self, model: &Model, handle: HandleIndex, port: PortIndex) -> bool;

    /// Establish model level effects of a connection. Returning false
    /// rejects it; the caller then drops the geometric connection.
    fn connect(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex, port: PortIndex) -> bool;

    /// Undo model level effects of a connection that is about to break
    fn disconnect(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex);
}

/// Shared state and default behaviour of every real connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseConnector {
    pub element: ItemId,
    pub line: ItemId,
    pub diagram: DiagramId,
}

impl BaseConnector {
    /// Either item may be mid-unlink (no diagram), but not both, and two
    /// items on different diagrams can never be connected.
    pub fn new(model: &Model, element: ItemId, line: ItemId) -> Self {
        let element_diagram = model.item(element).and_then(Item::diagram);
        let line_diagram = model.item(line).and_then(Item::diagram);
        assert!(
            element_diagram == line_diagram || element_diagram.is_none() || line_diagram.is_none(),
            "Items {} and {} live on different diagrams",
            element,
            line
        );
        let Some(diagram) = element_diagram.or(line_diagram) else {
            panic!("Neither {} nor {} is on a diagram", element, line);
        };
        Self {
            element,
            line,
            diagram,
        }
    }

    /// Item the given line handle is attached to
    pub fn get_connected(&self, model: &Model, handle: HandleIndex) -> Option<ItemId> {
        model.connection(self.line, handle).map(|c| c.connected)
    }

    /// The line's other handle
    pub fn opposite(&self, model: &Model, handle: HandleIndex) -> HandleIndex {
        model.opposite(self.line, handle).unwrap_or(if handle == HandleIndex::HEAD {
            HandleIndex::TAIL
        } else {
            HandleIndex::HEAD
        })
    }

    /// True when the element is on a diagram and it is the line's diagram
    pub fn allow(&self, model: &Model) -> bool {
        let element = model.item(self.element).and_then(Item::diagram);
        element.is_some() && element == model.item(self.line).and_then(Item::diagram)
    }

    pub fn connect(&self) -> bool {
        true
    }

    pub fn disconnect(&self) {}
}

impl Connector for BaseConnector {
    fn allow(&self, model: &Model, _handle: HandleIndex, _port: PortIndex) -> bool {
        BaseConnector::allow(self, model)
    }

    fn connect(&self, _cx: &mut ConnectContext<'_>, _handle: HandleIndex, _port: PortIndex) -> bool {
        BaseConnector::connect(self)
    }

    fn disconnect(&self, _cx: &mut ConnectContext<'_>, _handle: HandleIndex) {
        BaseConnector::disconnect(self)
    }
}

/// Resolved when no connector is registered for a pair of kinds
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConnector;

impl Connector for NoConnector {
    fn allow(&self, _model: &Model, _handle: HandleIndex, _port: PortIndex) -> bool {
        false
    }

    fn connect(&self, _cx: &mut ConnectContext<'_>, _handle: HandleIndex, _port: PortIndex) -> bool {
        false
    }

    fn disconnect(&self, _cx: &mut ConnectContext<'_>, _handle: HandleIndex) {}
}
