//! An editing session: one model, its connector table and undo history.

use std::rc::Rc;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use modelink_connect::{ConnectContext, ConnectionSink, ConnectorRegistry, HandleConnector, UnlinkConnections, unlink_item};
use modelink_core::Model;
use modelink_geometry::{HandleIndex, ItemId, PortIndex, Position};

use crate::undo::UndoManager;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Undo steps kept
    pub max_history: usize,
    /// How close a dragged handle must be to a port to glue
    pub glue_distance: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_history: 100,
            glue_distance: 10.0,
        }
    }
}

pub struct Session {
    model: Model,
    registry: Rc<ConnectorRegistry>,
    undo: UndoManager,
    options: SessionOptions,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self::with_registry(options, ConnectorRegistry::with_defaults())
    }

    pub fn with_registry(options: SessionOptions, registry: ConnectorRegistry) -> Self {
        let mut session = Self {
            model: Model::new(),
            registry: Rc::new(registry),
            undo: UndoManager::new(options.max_history),
            options,
        };
        session.install_unlink_hook();
        session
    }

    /// Element and diagram removal go through the connectors too
    fn install_unlink_hook(&mut self) {
        let hook = UnlinkConnections::new(Rc::clone(&self.registry));
        self.model.set_unlink_hook(Some(Rc::new(hook)));
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Direct model access; changes end up in the next committed step
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn set_registry(&mut self, registry: ConnectorRegistry) {
        self.registry = Rc::new(registry);
        self.install_unlink_hook();
    }

    pub fn history(&self) -> &UndoManager {
        &self.undo
    }

    pub fn set_history(&mut self, undo: UndoManager) {
        self.undo = undo;
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Attach a line handle to `target`. Without a port, the port nearest
    /// to the handle's current position is used.
    pub fn connect(
        &mut self,
        line: ItemId,
        handle: HandleIndex,
        target: ItemId,
        port: Option<PortIndex>,
    ) -> Result<bool> {
        let sink = match port {
            Some(port) => ConnectionSink::new(target, port),
            None => {
                let pos = self
                    .model
                    .geometry(line)
                    .and_then(|g| g.handle(handle))
                    .map(|h| h.pos)
                    .ok_or_else(|| anyhow!("Item {} has no {}", line, handle))?;
                ConnectionSink::nearest(&self.model, target, pos)
                    .ok_or_else(|| anyhow!("Item {} has no ports", target))?
            }
        };
        let mut cx = ConnectContext::new(&mut self.model, &self.registry);
        HandleConnector::new(line, handle).connect(&mut cx, sink)
    }

    /// Drop a handle at `pos`: it glues to the nearest allowed port in
    /// range, or comes loose if there is none.
    ///
    /// Returns the item the handle ended up attached to.
    pub fn drag(&mut self, line: ItemId, handle: HandleIndex, pos: Position) -> Result<Option<ItemId>> {
        self.model.move_handle(line, handle, pos)?;
        let connector = HandleConnector::new(line, handle);
        let sink = connector.glue(&self.model, &self.registry, pos, self.options.glue_distance);

        let mut cx = ConnectContext::new(&mut self.model, &self.registry);
        match sink {
            Some(sink) if connector.connect(&mut cx, sink)? => {
                debug!(%line, %handle, target = %sink.item, "handle glued");
                Ok(Some(sink.item))
            }
            _ => {
                connector.disconnect(&mut cx);
                Ok(None)
            }
        }
    }

    pub fn disconnect(&mut self, line: ItemId, handle: HandleIndex) -> bool {
        let mut cx = ConnectContext::new(&mut self.model, &self.registry);
        HandleConnector::new(line, handle).disconnect(&mut cx)
    }

    /// Remove an item, disconnecting everything attached to it
    pub fn unlink_item(&mut self, item: ItemId) -> Result<()> {
        let mut cx = ConnectContext::new(&mut self.model, &self.registry);
        unlink_item(&mut cx, item)
    }

    /// Close the current undo step
    pub fn commit(&mut self) -> bool {
        self.undo.commit(&mut self.model)
    }

    pub fn undo(&mut self) -> Result<bool> {
        let done = self.undo.undo(&mut self.model)?;
        if done {
            info!(remaining = self.undo.undo_count(), "undo");
        }
        Ok(done)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let done = self.undo.redo(&mut self.model)?;
        if done {
            info!(remaining = self.undo.redo_count(), "redo");
        }
        Ok(done)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use modelink_core::metamodel::*;
    use modelink_core::{ElementId, Kind, Value};

    use super::*;

    fn shape(session: &mut Session, kind: &'static Kind, origin: Position) -> (ItemId, ElementId) {
        let diagram = session.model().diagrams().next().unwrap().id();
        let model = session.model_mut();
        let subject = model.create(model_element(kind).unwrap()).unwrap();
        let item = model.create_item(diagram, kind, origin).unwrap();
        model.set_subject(item, Some(subject)).unwrap();
        (item, subject)
    }

    /// Two classes and a dependency line, all committed
    fn scene() -> (Session, ItemId, ItemId, ItemId) {
        let mut session = Session::default();
        let diagram = session.model_mut().create_diagram("main", None);
        let (a, _) = shape(&mut session, &CLASS_ITEM, Position::new(0, 0));
        let (b, _) = shape(&mut session, &CLASS_ITEM, Position::new(300, 0));
        let line = session
            .model_mut()
            .create_item(diagram, &DEPENDENCY_ITEM, Position::new(100, 25))
            .unwrap();
        session.commit();
        (session, a, b, line)
    }

    #[test]
    fn connect_uses_nearest_port() {
        let (mut session, a, b, line) = scene();
        // head at (100, 25) sits on the right side of a
        assert!(session.connect(line, HandleIndex::HEAD, a, None).unwrap());
        assert_eq!(
            session.model().connection(line, HandleIndex::HEAD).unwrap().port,
            PortIndex(1)
        );
        assert!(session.connect(line, HandleIndex::TAIL, b, None).unwrap());
        assert!(session.model().subject(line).is_some());
    }

    #[test]
    fn undo_connect_removes_relationship() {
        let (mut session, a, b, line) = scene();
        session.connect(line, HandleIndex::HEAD, a, None).unwrap();
        session.connect(line, HandleIndex::TAIL, b, None).unwrap();
        session.commit();
        let relation = session.model().subject(line).unwrap();

        assert!(session.undo().unwrap());
        assert!(session.model().subject(line).is_none());
        assert!(session.model().lookup(relation).is_none());
        assert!(session.model().connection(line, HandleIndex::TAIL).is_none());
        assert!(session.model().connection(line, HandleIndex::HEAD).is_none());

        assert!(session.redo().unwrap());
        assert_eq!(session.model().subject(line), Some(relation));
        assert_eq!(
            session.model().connection(line, HandleIndex::TAIL).unwrap().connected,
            b
        );
        assert_eq!(
            session.model().role_value(relation, &DEPENDENCY_SUPPLIER),
            session.model().subject(a)
        );
    }

    #[test]
    fn undo_unlink_restores_connections() {
        let (mut session, a, b, line) = scene();
        session.connect(line, HandleIndex::HEAD, a, None).unwrap();
        session.connect(line, HandleIndex::TAIL, b, None).unwrap();
        session.commit();
        let relation = session.model().subject(line).unwrap();
        let class = session.model().subject(a).unwrap();

        session.unlink_item(a).unwrap();
        session.commit();
        assert!(session.model().item(a).is_none());
        assert!(session.model().subject(line).is_none());

        session.undo().unwrap();
        assert_eq!(session.model().subject(a), Some(class));
        assert_eq!(session.model().subject(line), Some(relation));
        assert_eq!(
            session.model().connection(line, HandleIndex::HEAD).unwrap().connected,
            a
        );
    }

    #[test]
    fn removing_element_clears_line_subject() {
        let (mut session, a, b, line) = scene();
        session.connect(line, HandleIndex::HEAD, a, None).unwrap();
        session.connect(line, HandleIndex::TAIL, b, None).unwrap();
        session.commit();
        let relation = session.model().subject(line).unwrap();
        let class = session.model().subject(a).unwrap();

        session.model_mut().unlink(class).unwrap();
        session.commit();
        assert!(session.model().connection(line, HandleIndex::HEAD).is_none());
        assert!(session.model().subject(line).is_none());
        assert!(session.model().lookup(relation).is_some());

        session.undo().unwrap();
        assert_eq!(session.model().subject(a), Some(class));
        assert_eq!(session.model().subject(line), Some(relation));
        assert_eq!(
            session.model().connection(line, HandleIndex::HEAD).unwrap().connected,
            a
        );
    }

    #[test]
    fn replacing_registry_keeps_unlink_hook() {
        let (mut session, a, b, line) = scene();
        session.connect(line, HandleIndex::HEAD, a, None).unwrap();
        session.connect(line, HandleIndex::TAIL, b, None).unwrap();
        session.set_registry(ConnectorRegistry::with_defaults());
        let class = session.model().subject(b).unwrap();

        session.model_mut().unlink(class).unwrap();
        assert!(session.model().subject(line).is_none());
    }

    #[test]
    fn undo_that_fails_can_be_retried() {
        let (mut session, a, _b, line) = scene();
        let class = session.model().subject(a).unwrap();
        session.connect(line, HandleIndex::HEAD, a, Some(PortIndex(1))).unwrap();
        session
            .model_mut()
            .set_attribute(class, "name", Some(Value::from("Order")))
            .unwrap();
        session.commit();

        // drop the connection behind the session's back
        session.model_mut().disconnect_handle(line, HandleIndex::HEAD);
        assert!(session.undo().is_err());
        assert_eq!(session.history().undo_count(), 2);
        assert_eq!(session.model().element(class).unwrap().name(), Some("Order"));

        session
            .model_mut()
            .connect_handle(line, HandleIndex::HEAD, a, PortIndex(1))
            .unwrap();
        assert!(session.undo().unwrap());
        assert_eq!(session.model().element(class).unwrap().name(), None);
        assert!(session.model().connection(line, HandleIndex::HEAD).is_none());
    }

    #[test]
    fn drag_glues_or_releases() {
        let (mut session, _a, b, line) = scene();
        let glued = session.drag(line, HandleIndex::TAIL, Position::new(295, 25)).unwrap();
        assert_eq!(glued, Some(b));

        let loose = session.drag(line, HandleIndex::TAIL, Position::new(200, 200)).unwrap();
        assert_eq!(loose, None);
        assert!(session.model().connection(line, HandleIndex::TAIL).is_none());
    }

    #[test]
    fn undo_of_reconnect_restores_port() {
        let (mut session, a, b, line) = scene();
        session.connect(line, HandleIndex::HEAD, a, Some(PortIndex(1))).unwrap();
        session.connect(line, HandleIndex::TAIL, b, Some(PortIndex(3))).unwrap();
        session.commit();
        let relation = session.model().subject(line);

        session.connect(line, HandleIndex::HEAD, a, Some(PortIndex(2))).unwrap();
        session.commit();
        session.undo().unwrap();

        let head = session.model().connection(line, HandleIndex::HEAD).unwrap();
        assert_eq!((head.connected, head.port), (a, PortIndex(1)));
        assert_eq!(session.model().subject(line), relation);
    }
}
