//! Copy and paste of model elements.
//!
//! Pasting happens in two phases: [`paste`] creates the new element and
//! its attributes, [`PendingPaste::finish`] resolves references once every
//! element of the buffer exists.

use anyhow::Result;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::diagram::DiagramId;
use crate::element::{ElementId, ElementSnapshot};
use crate::metamodel::{self, OWNING_PACKAGE, PACKAGE};
use crate::model::Model;

/// Snapshots keyed by the id of the element they were taken from
pub type CopyBuffer = IndexMap<ElementId, ElementSnapshot>;

/// Snapshot a single element
pub fn copy(model: &Model, element: ElementId) -> CopyBuffer {
    model
        .lookup(element)
        .map(|e| (element, e.snapshot()))
        .into_iter()
        .collect()
}

/// A pasted element whose references are not resolved yet
#[derive(Debug)]
pub struct PendingPaste {
    element: ElementId,
    snapshot: ElementSnapshot,
    diagram: DiagramId,
}

impl PendingPaste {
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Assign references through `resolve`, which maps a copied id to an
    /// element of the model. Unresolvable references are dropped. An
    /// element left without owning package lands in the diagram's package.
    pub fn finish(self, model: &mut Model, mut resolve: impl FnMut(&Model, ElementId) -> Option<ElementId>) -> Result<()> {
        let kind = self.snapshot.kind;
        for (name, values) in &self.snapshot.references {
            let Some(role) = metamodel::role(kind, name) else {
                warn!(%kind, role = %name, "dropping reference to unknown role");
                continue;
            };
            for value in values {
                let Some(resolved) = resolve(&*model, *value) else {
                    continue;
                };
                if role.many {
                    model.add_role(self.element, role, resolved)?;
                } else {
                    model.set_role(self.element, role, Some(resolved))?;
                }
            }
        }

        if model.role_value(self.element, &OWNING_PACKAGE).is_none() {
            let package = model
                .diagram(self.diagram)
                .and_then(|d| d.owner)
                .filter(|owner| model.kind_of(*owner).is_some_and(|k| k.is_a(&PACKAGE)));
            if let Some(package) = package {
                model.set_role(self.element, &OWNING_PACKAGE, Some(package))?;
            }
        }
        Ok(())
    }
}

/// Create a fresh element from a snapshot, scoped to `diagram`
pub fn paste(model: &mut Model, snapshot: &ElementSnapshot, diagram: DiagramId) -> Result<PendingPaste> {
    let element = model.create(snapshot.kind)?;
    for (name, value) in &snapshot.attributes {
        model.set_attribute(element, name, Some(value.clone()))?;
    }
    Ok(PendingPaste {
        element,
        snapshot: snapshot.clone(),
        diagram,
    })
}

/// Paste a whole buffer. References between buffered elements point at the
/// new copies; other references are kept if the element still exists.
///
/// Returns the new elements in buffer order.
pub fn paste_model(model: &mut Model, buffer: &CopyBuffer, diagram: DiagramId) -> Result<Vec<ElementId>> {
    let mut pending = Vec::with_capacity(buffer.len());
    let mut created: IndexMap<ElementId, ElementId> = IndexMap::new();
    for (old, snapshot) in buffer {
        let paster = paste(model, snapshot, diagram)?;
        created.insert(*old, paster.element());
        pending.push(paster);
    }

    for paster in pending {
        paster.finish(model, |model, id| {
            created
                .get(&id)
                .copied()
                .or_else(|| model.lookup(id).map(|e| e.id()))
        })?;
    }

    debug!(count = created.len(), %diagram, "pasted model elements");
    Ok(created.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Value;
    use crate::metamodel::*;

    #[test]
    fn copy_of_missing_element_is_empty() {
        let model = Model::new();
        assert!(copy(&model, ElementId::new()).is_empty());
    }

    #[test]
    fn paste_creates_new_element_with_attributes_and_references() {
        let mut model = Model::new();
        let supplier = model.create(&CLASS).unwrap();
        let dependency = model.create(&DEPENDENCY).unwrap();
        model.set_attribute(dependency, "name", Some(Value::from("uses"))).unwrap();
        model.add_role(dependency, &DEPENDENCY_SUPPLIER, supplier).unwrap();
        let diagram = model.create_diagram("d", None);

        let buffer = copy(&model, dependency);
        let pasted = paste_model(&mut model, &buffer, diagram).unwrap();
        assert_eq!(pasted.len(), 1);
        assert_ne!(pasted[0], dependency);

        let copy = model.element(pasted[0]).unwrap();
        assert_eq!(copy.kind(), &DEPENDENCY);
        assert_eq!(copy.name(), Some("uses"));
        assert_eq!(model.role_values(pasted[0], &DEPENDENCY_SUPPLIER), &[supplier]);
        assert_eq!(model.opposites(supplier, "supplier_dependency"), &[dependency, pasted[0]]);
    }

    #[test]
    fn references_to_deleted_elements_are_dropped() {
        let mut model = Model::new();
        let supplier = model.create(&CLASS).unwrap();
        let dependency = model.create(&DEPENDENCY).unwrap();
        model.add_role(dependency, &DEPENDENCY_SUPPLIER, supplier).unwrap();
        let diagram = model.create_diagram("d", None);
        let buffer = copy(&model, dependency);
        model.unlink(supplier).unwrap();

        let pasted = paste_model(&mut model, &buffer, diagram).unwrap();
        assert!(model.role_values(pasted[0], &DEPENDENCY_SUPPLIER).is_empty());
    }

    #[test]
    fn pasted_element_lands_in_diagram_package() {
        let mut model = Model::new();
        let package = model.create(&PACKAGE).unwrap();
        let diagram = model.create_diagram("d", Some(package));
        let dependency = model.create(&DEPENDENCY).unwrap();
        let buffer = copy(&model, dependency);

        let pasted = paste_model(&mut model, &buffer, diagram).unwrap();
        assert_eq!(model.role_value(pasted[0], &OWNING_PACKAGE), Some(package));
    }

    #[test]
    fn references_inside_buffer_point_at_copies() {
        let mut model = Model::new();
        let diagram = model.create_diagram("d", None);
        let package = model.create(&PACKAGE).unwrap();
        let class = model.create(&CLASS).unwrap();
        model.set_role(class, &OWNING_PACKAGE, Some(package)).unwrap();

        let mut buffer = copy(&model, class);
        buffer.extend(copy(&model, package));
        let pasted = paste_model(&mut model, &buffer, diagram).unwrap();
        assert_eq!(model.role_value(pasted[0], &OWNING_PACKAGE), Some(pasted[1]));
    }
}
