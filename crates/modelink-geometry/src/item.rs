//! Item geometry: handles and ports.
//!
//! Element items are boxes with four corner handles and one port per side.
//! Line items have a head and a tail handle and a single port spanning the
//! line, so other lines can attach to them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::position::Position;

/// Default width of a freshly created element item
pub const DEFAULT_WIDTH: i32 = 100;
/// Default height of a freshly created element item
pub const DEFAULT_HEIGHT: i32 = 50;

/// Diagram item identifier - UUID for global uniqueness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a handle within its item. Stable across serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleIndex(pub usize);

impl HandleIndex {
    /// Head handle of a line
    pub const HEAD: HandleIndex = HandleIndex(0);
    /// Tail handle of a line (lines always have exactly two handles)
    pub const TAIL: HandleIndex = HandleIndex(1);
}

impl std::fmt::Display for HandleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// Index of a port within its item. Stable across serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortIndex(pub usize);

impl std::fmt::Display for PortIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

/// A movable endpoint marker on an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handle {
    pub pos: Position,
    /// Whether this handle may be attached to a port
    pub connectable: bool,
}

impl Handle {
    pub fn new(pos: Position, connectable: bool) -> Self {
        Self { pos, connectable }
    }
}

/// An attachment point: the segment between two of the owner's handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub start: HandleIndex,
    pub end: HandleIndex,
}

/// Handles and ports of one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGeometry {
    handles: Vec<Handle>,
    ports: Vec<Port>,
    line: bool,
}

impl ItemGeometry {
    /// Box-shaped element: handles nw, ne, se, sw; ports top, right, bottom, left
    pub fn element(origin: Position, width: i32, height: i32) -> Self {
        let handles = vec![
            Handle::new(origin, false),
            Handle::new(origin.translated(width, 0), false),
            Handle::new(origin.translated(width, height), false),
            Handle::new(origin.translated(0, height), false),
        ];
        let ports = (0..4)
            .map(|i| Port {
                start: HandleIndex(i),
                end: HandleIndex((i + 1) % 4),
            })
            .collect();
        Self {
            handles,
            ports,
            line: false,
        }
    }

    /// Straight line from head to tail
    pub fn line(head: Position, tail: Position) -> Self {
        Self {
            handles: vec![Handle::new(head, true), Handle::new(tail, true)],
            ports: vec![Port {
                start: HandleIndex::HEAD,
                end: HandleIndex::TAIL,
            }],
            line: true,
        }
    }

    pub fn is_line(&self) -> bool {
        self.line
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn handle(&self, index: HandleIndex) -> Option<&Handle> {
        self.handles.get(index.0)
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Move a handle; returns the previous position
    pub fn set_handle_pos(&mut self, index: HandleIndex, pos: Position) -> Option<Position> {
        let handle = self.handles.get_mut(index.0)?;
        Some(std::mem::replace(&mut handle.pos, pos))
    }

    /// Translate every handle
    pub fn translate(&mut self, dx: i32, dy: i32) {
        for handle in &mut self.handles {
            handle.pos = handle.pos.translated(dx, dy);
        }
    }

    /// The other end of a line
    pub fn opposite(&self, handle: HandleIndex) -> HandleIndex {
        if handle == HandleIndex::HEAD {
            HandleIndex(self.handles.len().saturating_sub(1))
        } else {
            HandleIndex::HEAD
        }
    }

    /// Current end points of a port
    pub fn port_segment(&self, port: PortIndex) -> Option<(Position, Position)> {
        let port = self.ports.get(port.0)?;
        let start = self.handles.get(port.start.0)?.pos;
        let end = self.handles.get(port.end.0)?.pos;
        Some((start, end))
    }

    /// Closest point on a port to `pos`, with its distance
    pub fn glue(&self, port: PortIndex, pos: Position) -> Option<(Position, f64)> {
        let (start, end) = self.port_segment(port)?;
        Some(pos.project_onto(start, end))
    }

    /// Port closest to `pos`, with the glued point and distance
    pub fn nearest_port(&self, pos: Position) -> Option<(PortIndex, Position, f64)> {
        (0..self.ports.len())
            .filter_map(|i| {
                let (glued, d) = self.glue(PortIndex(i), pos)?;
                Some((PortIndex(i), glued, d))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    /// Bounding box (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;

        for handle in &self.handles {
            min_x = min_x.min(handle.pos.x);
            min_y = min_y.min(handle.pos.y);
            max_x = max_x.max(handle.pos.x);
            max_y = max_y.max(handle.pos.y);
        }

        (min_x, min_y, max_x, max_y)
    }
}
