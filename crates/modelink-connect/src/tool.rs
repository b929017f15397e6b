//! Handle connection operations, as performed by a drag tool.
//!
//! [`HandleConnector`] drives one line handle: finding a port to glue to,
//! then connecting it geometrically and at model level. These are the
//! operations that record [`ConnectionEvent`]s; the connectors themselves
//! only touch the model.

use std::rc::Rc;

use anyhow::Result;
use tracing::debug;

use modelink_core::{ConnectionEvent, HandleConnection, Item, Model, UnlinkHook};
use modelink_geometry::{HandleIndex, ItemId, PortIndex, Position};

use crate::connector::Connector;
use crate::context::ConnectContext;
use crate::registry::ConnectorRegistry;

/// A port on a target item a handle can attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSink {
    pub item: ItemId,
    pub port: PortIndex,
}

impl ConnectionSink {
    pub fn new(item: ItemId, port: PortIndex) -> Self {
        Self { item, port }
    }

    /// Sink on the port of `item` closest to `pos`
    pub fn nearest(model: &Model, item: ItemId, pos: Position) -> Option<Self> {
        let (port, _, _) = model.geometry(item)?.nearest_port(pos)?;
        Some(Self::new(item, port))
    }
}

/// One handle of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleConnector {
    pub item: ItemId,
    pub handle: HandleIndex,
}

impl HandleConnector {
    pub fn new(item: ItemId, handle: HandleIndex) -> Self {
        Self { item, handle }
    }

    /// Whether the handle may attach to the sink
    pub fn allow(&self, model: &Model, registry: &ConnectorRegistry, sink: ConnectionSink) -> bool {
        let (Some(target), Some(line)) = (model.item_kind(sink.item), model.item_kind(self.item)) else {
            return false;
        };
        registry.can_connect(target, line)
            && registry
                .connector(model, sink.item, self.item)
                .allow(model, self.handle, sink.port)
    }

    /// Nearest port within `max_distance` of `pos` the handle may attach to
    pub fn glue(
        &self,
        model: &Model,
        registry: &ConnectorRegistry,
        pos: Position,
        max_distance: f64,
    ) -> Option<ConnectionSink> {
        let diagram = model.item(self.item).and_then(Item::diagram)?;
        let mut best: Option<(ConnectionSink, f64)> = None;

        for target in model.diagram_items(diagram) {
            if target == self.item {
                continue;
            }
            let Some((port, _, distance)) = model.geometry(target).and_then(|g| g.nearest_port(pos)) else {
                continue;
            };
            if distance > max_distance || best.is_some_and(|(_, d)| d <= distance) {
                continue;
            }
            let sink = ConnectionSink::new(target, port);
            if self.allow(model, registry, sink) {
                best = Some((sink, distance));
            }
        }

        best.map(|(sink, _)| sink)
    }

    /// Attach the handle to `sink`.
    ///
    /// Moving to another port of the same item only reconnects the
    /// geometry. Moving to another item disconnects from the old one first.
    /// Returns false when the connection is not allowed or the connector
    /// rejects it.
    pub fn connect(&self, cx: &mut ConnectContext<'_>, sink: ConnectionSink) -> Result<bool> {
        let connector = cx.connector(sink.item, self.item);
        if !connector.allow(cx.model, self.handle, sink.port) {
            debug!(item = %self.item, handle = %self.handle, target = %sink.item, "connection not allowed");
            return Ok(false);
        }

        match cx.model.connection(self.item, self.handle).copied() {
            Some(current) if current.connected == sink.item => {
                if current.port != sink.port {
                    cx.model.reconnect_handle(self.item, self.handle, sink.port)?;
                    cx.model.solve(self.item);
                    cx.model.emit(ConnectionEvent::Reconnected(HandleConnection::new(
                        self.item,
                        self.handle,
                        sink.item,
                        current.port,
                    )));
                }
                Ok(true)
            }
            Some(current) => {
                let previous = cx.connector(current.connected, self.item);
                previous.disconnect(cx, self.handle);
                cx.model.disconnect_handle(self.item, self.handle);
                cx.model.emit(ConnectionEvent::TemporaryDisconnected((&current).into()));
                self.connect_new(cx, connector.as_ref(), sink)
            }
            None => self.connect_new(cx, connector.as_ref(), sink),
        }
    }

    fn connect_new(&self, cx: &mut ConnectContext<'_>, connector: &dyn Connector, sink: ConnectionSink) -> Result<bool> {
        cx.model.connect_handle(self.item, self.handle, sink.item, sink.port)?;
        if !connector.connect(cx, self.handle, sink.port) {
            cx.model.disconnect_handle(self.item, self.handle);
            debug!(item = %self.item, handle = %self.handle, target = %sink.item, "connection rejected");
            return Ok(false);
        }
        cx.model.solve(self.item);
        cx.model.emit(ConnectionEvent::Connected(HandleConnection::new(
            self.item,
            self.handle,
            sink.item,
            sink.port,
        )));
        debug!(item = %self.item, handle = %self.handle, target = %sink.item, port = %sink.port, "connected");
        Ok(true)
    }

    /// Detach the handle. Returns false if it was not attached.
    pub fn disconnect(&self, cx: &mut ConnectContext<'_>) -> bool {
        let Some(current) = cx.model.connection(self.item, self.handle).copied() else {
            return false;
        };
        let connector = cx.connector(current.connected, self.item);
        connector.disconnect(cx, self.handle);
        cx.model.disconnect_handle(self.item, self.handle);
        cx.model.emit(ConnectionEvent::Disconnected((&current).into()));
        debug!(item = %self.item, handle = %self.handle, target = %current.connected, "disconnected");
        true
    }
}

/// Remove an item from its diagram, letting every connector involved
/// disconnect at model level first
pub fn unlink_item(cx: &mut ConnectContext<'_>, item: ItemId) -> Result<()> {
    disconnect_item(cx, item)?;
    cx.model.unlink_item(item)
}

/// Run the connector `disconnect` of every connection involving `item`,
/// which is flagged as unlinking. Geometric connections stay in place.
pub fn disconnect_item(cx: &mut ConnectContext<'_>, item: ItemId) -> Result<()> {
    cx.model.begin_unlink(item)?;
    let mut involved = cx.model.connections_of(item);
    involved.extend(cx.model.connections_to(item));

    for c in involved {
        // an earlier disconnect may have cascaded here already
        let attached = cx
            .model
            .connection(c.item, c.handle)
            .is_some_and(|current| current.connected == c.connected);
        if !attached {
            continue;
        }
        let connector = cx.connector(c.connected, c.item);
        connector.disconnect(cx, c.handle);
    }
    Ok(())
}

/// Model unlink hook running connector disconnects for items removed along
/// with their element or diagram
#[derive(Debug)]
pub struct UnlinkConnections {
    registry: Rc<ConnectorRegistry>,
}

impl UnlinkConnections {
    pub fn new(registry: Rc<ConnectorRegistry>) -> Self {
        Self { registry }
    }
}

impl UnlinkHook for UnlinkConnections {
    fn unlinking(&self, model: &mut Model, item: ItemId) -> Result<()> {
        let mut cx = ConnectContext::new(model, &self.registry);
        disconnect_item(&mut cx, item)
    }
}
