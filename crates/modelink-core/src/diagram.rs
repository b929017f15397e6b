//! Diagrams and the presentation items placed on them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use modelink_geometry::{Canvas, ItemGeometry, ItemId};

use crate::element::ElementId;
use crate::kind::{Kind, serde_kind};
use crate::metamodel::LINE_PRESENTATION;

/// Diagram identifier - UUID for global uniqueness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiagramId(pub Uuid);

impl DiagramId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DiagramId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DiagramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observer notified when items of a diagram change or go away
pub trait DiagramView {
    fn request_update(&mut self, updated: &[ItemId], removed: &[ItemId]);
}

pub struct Diagram {
    id: DiagramId,
    pub name: String,
    /// Package the diagram lives in
    pub owner: Option<ElementId>,
    pub(crate) canvas: Canvas,
    pub(crate) items: Vec<ItemId>,
    pub(crate) views: Vec<Box<dyn DiagramView>>,
}

impl Diagram {
    pub(crate) fn new(id: DiagramId, name: String, owner: Option<ElementId>) -> Self {
        Self {
            id,
            name,
            owner,
            canvas: Canvas::new(),
            items: Vec::new(),
            views: Vec::new(),
        }
    }

    pub fn id(&self) -> DiagramId {
        self.id
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Items in creation order
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub(crate) fn notify(&mut self, updated: &[ItemId], removed: &[ItemId]) {
        for view in &mut self.views {
            view.request_update(updated, removed);
        }
    }
}

impl std::fmt::Debug for Diagram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagram")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("items", &self.items)
            .field("views", &self.views.len())
            .finish()
    }
}

/// A presentation item on a diagram
#[derive(Debug, Clone)]
pub struct Item {
    id: ItemId,
    kind: &'static Kind,
    diagram: DiagramId,
    pub(crate) unlinking: bool,
    pub(crate) subject: Option<ElementId>,
}

impl Item {
    pub(crate) fn new(id: ItemId, kind: &'static Kind, diagram: DiagramId) -> Self {
        Self {
            id,
            kind,
            diagram,
            unlinking: false,
            subject: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> &'static Kind {
        self.kind
    }

    /// Diagram the item lives on; `None` while the item is being unlinked
    pub fn diagram(&self) -> Option<DiagramId> {
        (!self.unlinking).then_some(self.diagram)
    }

    /// Diagram whose canvas holds the item, regardless of unlink state
    pub fn canvas_diagram(&self) -> DiagramId {
        self.diagram
    }

    pub fn subject(&self) -> Option<ElementId> {
        self.subject
    }

    pub fn is_line(&self) -> bool {
        self.kind.is_a(&LINE_PRESENTATION)
    }

    pub fn is_unlinking(&self) -> bool {
        self.unlinking
    }
}

/// Everything needed to put an unlinked item back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub diagram: DiagramId,
    #[serde(with = "serde_kind")]
    pub kind: &'static Kind,
    pub geometry: ItemGeometry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::{CLASS_ITEM, DEPENDENCY_ITEM};

    #[test]
    fn unlinking_item_has_no_diagram() {
        let diagram = DiagramId::new();
        let mut item = Item::new(ItemId::new(), &CLASS_ITEM, diagram);
        assert_eq!(item.diagram(), Some(diagram));
        item.unlinking = true;
        assert_eq!(item.diagram(), None);
        assert_eq!(item.canvas_diagram(), diagram);
    }

    #[test]
    fn line_items_are_recognized() {
        let diagram = DiagramId::new();
        assert!(Item::new(ItemId::new(), &DEPENDENCY_ITEM, diagram).is_line());
        assert!(!Item::new(ItemId::new(), &CLASS_ITEM, diagram).is_line());
    }
}
