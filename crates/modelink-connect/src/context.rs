//! Per-operation state for connect and disconnect cascades.
//!
//! A relationship line that gains or loses its subject makes every item
//! attached to the line re-evaluate its own connection. Instead of
//! recursing through connectors, the cascade runs as an explicit work list
//! owned by the context.

use std::collections::{HashSet, VecDeque};

use modelink_core::Model;
use modelink_geometry::{Connection, HandleIndex, ItemId};
use tracing::trace;

use crate::connector::Connector;
use crate::registry::ConnectorRegistry;

pub struct ConnectContext<'a> {
    pub model: &'a mut Model,
    registry: &'a ConnectorRegistry,
    queue: VecDeque<Connection>,
    draining: bool,
    disconnecting: bool,
}

impl<'a> ConnectContext<'a> {
    pub fn new(model: &'a mut Model, registry: &'a ConnectorRegistry) -> Self {
        Self {
            model,
            registry,
            queue: VecDeque::new(),
            draining: false,
            disconnecting: false,
        }
    }

    pub fn registry(&self) -> &'a ConnectorRegistry {
        self.registry
    }

    /// Connector for `line` attaching to `element`
    pub fn connector(&self, element: ItemId, line: ItemId) -> Box<dyn Connector> {
        self.registry.connector(&*self.model, element, line)
    }

    /// Queue connections to be connected again and process the queue.
    ///
    /// Nested calls only enqueue; the outermost call drains breadth first,
    /// in registry order, visiting each handle once.
    pub(crate) fn cascade_connect(&mut self, connections: impl IntoIterator<Item = Connection>) {
        self.queue.extend(connections);
        if self.draining {
            return;
        }

        self.draining = true;
        let mut visited: HashSet<(ItemId, HandleIndex)> = HashSet::new();
        while let Some(c) = self.queue.pop_front() {
            if !visited.insert((c.item, c.handle)) {
                continue;
            }
            let still_attached = self
                .model
                .connection(c.item, c.handle)
                .is_some_and(|current| current.connected == c.connected);
            if !still_attached {
                continue;
            }
            trace!(item = %c.item, handle = %c.handle, connected = %c.connected, "cascade connect");
            let connector = self.connector(c.connected, c.item);
            connector.connect(self, c.handle, c.port);
        }
        self.draining = false;
    }

    /// Disconnect everything hanging off `line`, transitively.
    ///
    /// Peers are collected breadth first and disconnected deepest level
    /// first, so a peer still sees its own subject while the items attached
    /// to it let go. Returns the connections attached directly to `line`.
    pub(crate) fn cascade_disconnect(&mut self, line: ItemId) -> Vec<Connection> {
        self.model.solve(line);
        let direct: Vec<Connection> = self
            .model
            .connections_to(line)
            .into_iter()
            .filter(|c| c.item != line)
            .collect();
        if self.disconnecting {
            return direct;
        }

        let mut seen: HashSet<(ItemId, HandleIndex)> = direct.iter().map(|c| (c.item, c.handle)).collect();
        let mut expanded: HashSet<ItemId> = HashSet::from([line]);
        let mut levels = vec![direct.clone()];
        loop {
            let mut next = Vec::new();
            for c in levels.last().into_iter().flatten() {
                if !expanded.insert(c.item) {
                    continue;
                }
                for peer in self.model.connections_to(c.item) {
                    if peer.item != line && seen.insert((peer.item, peer.handle)) {
                        next.push(peer);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }

        self.disconnecting = true;
        for level in levels.iter().rev() {
            for c in level {
                trace!(item = %c.item, handle = %c.handle, connected = %c.connected, "cascade disconnect");
                let connector = self.connector(c.connected, c.item);
                connector.disconnect(self, c.handle);
            }
        }
        self.disconnecting = false;
        direct
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use modelink_core::metamodel::*;
    use modelink_core::DiagramId;
    use modelink_geometry::{PortIndex, Position};

    use super::*;
    use crate::registry::ConnectorFactory;

    thread_local! {
        static VISITS: RefCell<Vec<(&'static str, ItemId, HandleIndex)>> = const { RefCell::new(Vec::new()) };
    }

    fn visits() -> Vec<(&'static str, ItemId, HandleIndex)> {
        VISITS.with(|v| v.borrow().clone())
    }

    /// Logs each visit and cascades to whatever hangs off its own line
    struct Recording {
        line: ItemId,
    }

    impl Connector for Recording {
        fn allow(&self, _model: &Model, _handle: HandleIndex, _port: PortIndex) -> bool {
            true
        }

        fn connect(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex, _port: PortIndex) -> bool {
            VISITS.with(|v| v.borrow_mut().push(("connect", self.line, handle)));
            let peers = cx.model.connections_to(self.line);
            cx.cascade_connect(peers);
            true
        }

        fn disconnect(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex) {
            VISITS.with(|v| v.borrow_mut().push(("disconnect", self.line, handle)));
            cx.cascade_disconnect(self.line);
        }
    }

    fn recording(_model: &Model, _element: ItemId, line: ItemId) -> Box<dyn Connector> {
        Box::new(Recording { line })
    }

    /// Lines attached to lines:
    ///
    /// root <- p1.head, p2.head
    /// p1 <- p2.tail, q.head
    /// p2 <- q.tail
    struct Web {
        model: Model,
        registry: ConnectorRegistry,
        root: ItemId,
        p1: ItemId,
        p2: ItemId,
        q: ItemId,
    }

    fn web() -> Web {
        VISITS.with(|v| v.borrow_mut().clear());
        let mut model = Model::new();
        let diagram: DiagramId = model.create_diagram("d", None);
        let mut line = || model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(0, 0)).unwrap();
        let (root, p1, p2, q) = (line(), line(), line(), line());
        for (item, handle, target) in [
            (p1, HandleIndex::HEAD, root),
            (p2, HandleIndex::HEAD, root),
            (p2, HandleIndex::TAIL, p1),
            (q, HandleIndex::HEAD, p1),
            (q, HandleIndex::TAIL, p2),
        ] {
            model.connect_handle(item, handle, target, PortIndex(0)).unwrap();
        }

        let mut registry = ConnectorRegistry::new();
        registry.register(
            &LINE_PRESENTATION,
            &LINE_PRESENTATION,
            ConnectorFactory::new("Recording", recording),
        );
        Web {
            model,
            registry,
            root,
            p1,
            p2,
            q,
        }
    }

    #[test]
    fn connect_cascade_is_breadth_first_and_visits_once() {
        let mut w = web();
        let mut cx = ConnectContext::new(&mut w.model, &w.registry);
        let peers = cx.model.connections_to(w.root);
        cx.cascade_connect(peers);

        assert_eq!(
            visits(),
            vec![
                ("connect", w.p1, HandleIndex::HEAD),
                ("connect", w.p2, HandleIndex::HEAD),
                ("connect", w.p2, HandleIndex::TAIL),
                ("connect", w.q, HandleIndex::HEAD),
                ("connect", w.q, HandleIndex::TAIL),
            ]
        );
    }

    #[test]
    fn connect_cascade_skips_handles_that_came_loose() {
        let mut w = web();
        w.model.disconnect_handle(w.p2, HandleIndex::HEAD);
        let stale = vec![
            *w.model.connection(w.p1, HandleIndex::HEAD).unwrap(),
            Connection {
                item: w.p2,
                handle: HandleIndex::HEAD,
                connected: w.root,
                port: PortIndex(0),
                constraint: None,
            },
        ];

        let mut cx = ConnectContext::new(&mut w.model, &w.registry);
        cx.cascade_connect(stale);
        assert!(!visits().contains(&("connect", w.p2, HandleIndex::HEAD)));
        assert_eq!(visits()[0], ("connect", w.p1, HandleIndex::HEAD));
    }

    #[test]
    fn disconnect_cascade_runs_deepest_level_first() {
        let mut w = web();
        let mut cx = ConnectContext::new(&mut w.model, &w.registry);
        let direct = cx.cascade_disconnect(w.root);

        assert_eq!(
            direct.iter().map(|c| (c.item, c.handle)).collect::<Vec<_>>(),
            vec![(w.p1, HandleIndex::HEAD), (w.p2, HandleIndex::HEAD)]
        );
        // nested cascades from inside a disconnect add nothing
        assert_eq!(
            visits(),
            vec![
                ("disconnect", w.p2, HandleIndex::TAIL),
                ("disconnect", w.q, HandleIndex::HEAD),
                ("disconnect", w.q, HandleIndex::TAIL),
                ("disconnect", w.p1, HandleIndex::HEAD),
                ("disconnect", w.p2, HandleIndex::HEAD),
            ]
        );
        // geometry is left alone
        assert!(w.model.connection(w.q, HandleIndex::TAIL).is_some());
    }
}
