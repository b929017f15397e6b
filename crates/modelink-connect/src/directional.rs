//! Relationship connections between two distinct ends.

use modelink_core::{Model, Role};
use modelink_geometry::{HandleIndex, ItemId, PortIndex};

use crate::relationship::RelationshipConnect;

#[derive(Debug, Clone)]
pub struct DirectionalRelationshipConnect {
    pub relation: RelationshipConnect,
    /// Whether both ends may attach to the same item
    pub self_loops: bool,
}

impl DirectionalRelationshipConnect {
    pub fn new(model: &Model, element: ItemId, line: ItemId, self_loops: bool) -> Self {
        Self {
            relation: RelationshipConnect::new(model, element, line),
            self_loops,
        }
    }

    /// Both ends may not attach to the same item (unless self loops are
    /// supported), and may not both lack a subject.
    pub fn allow(&self, model: &Model, handle: HandleIndex, _port: PortIndex) -> bool {
        let base = &self.relation.base;
        let opposite = base.opposite(model, handle);
        let connected_to = base.get_connected(model, opposite);

        if connected_to == Some(base.element) && !self.self_loops {
            return false;
        }

        if let Some(other) = connected_to {
            if model.subject(other).is_none() && model.subject(base.element).is_none() {
                return false;
            }
        }

        base.allow(model)
    }

    /// Whether the element's subject, if any, fits the role's target kind
    pub fn subject_fits(model: &Model, item: ItemId, role: &Role) -> bool {
        model
            .subject(item)
            .and_then(|subject| model.kind_of(subject))
            .is_some_and(|kind| kind.is_a(role.target))
    }
}

#[cfg(test)]
mod tests {
    use modelink_core::metamodel::*;
    use modelink_core::DiagramId;
    use modelink_geometry::Position;

    use super::*;

    fn scene() -> (Model, DiagramId, ItemId, ItemId, ItemId) {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let a = model.create_item(diagram, &CLASS_ITEM, Position::new(0, 0)).unwrap();
        let b = model.create_item(diagram, &CLASS_ITEM, Position::new(300, 0)).unwrap();
        let line = model.create_item(diagram, &DEPENDENCY_ITEM, Position::new(100, 25)).unwrap();
        (model, diagram, a, b, line)
    }

    fn give_subject(model: &mut Model, item: ItemId) {
        let class = model.create(&CLASS).unwrap();
        model.set_subject(item, Some(class)).unwrap();
    }

    #[test]
    fn ends_without_subjects_are_rejected() {
        let (mut model, _, a, b, line) = scene();
        model.connect_handle(line, HandleIndex::TAIL, b, PortIndex(3)).unwrap();

        let head = DirectionalRelationshipConnect::new(&model, a, line, false);
        assert!(!head.allow(&model, HandleIndex::HEAD, PortIndex(1)));

        give_subject(&mut model, b);
        assert!(head.allow(&model, HandleIndex::HEAD, PortIndex(1)));
    }

    #[test]
    fn loose_opposite_end_defers_to_base() {
        let (model, _, a, _, line) = scene();
        let head = DirectionalRelationshipConnect::new(&model, a, line, false);
        assert!(head.allow(&model, HandleIndex::HEAD, PortIndex(1)));
    }

    #[test]
    fn self_loops_need_opting_in() {
        let (mut model, _, a, _, line) = scene();
        give_subject(&mut model, a);
        model.connect_handle(line, HandleIndex::TAIL, a, PortIndex(3)).unwrap();

        let plain = DirectionalRelationshipConnect::new(&model, a, line, false);
        assert!(!plain.allow(&model, HandleIndex::HEAD, PortIndex(1)));

        let looping = DirectionalRelationshipConnect::new(&model, a, line, true);
        assert!(looping.allow(&model, HandleIndex::HEAD, PortIndex(1)));
    }

    #[test]
    fn subject_fit_follows_role_target() {
        let (mut model, _, a, b, _) = scene();
        give_subject(&mut model, a);
        assert!(DirectionalRelationshipConnect::subject_fits(&model, a, &DEPENDENCY_SUPPLIER));
        assert!(!DirectionalRelationshipConnect::subject_fits(&model, b, &DEPENDENCY_SUPPLIER));
    }
}
