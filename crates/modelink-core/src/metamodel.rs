//! The built-in metamodel: element kinds, diagram item kinds, roles, and
//! the "represents" metadata tying a line item kind to the relationship it
//! draws.

use crate::kind::{Kind, Role};

// Model element kinds

pub static ELEMENT: Kind = Kind::new("Element", None);
pub static COMMENT: Kind = Kind::new("Comment", Some(&ELEMENT));
pub static NAMED_ELEMENT: Kind = Kind::new("NamedElement", Some(&ELEMENT));
pub static PACKAGE: Kind = Kind::new("Package", Some(&NAMED_ELEMENT));
pub static CLASSIFIER: Kind = Kind::new("Classifier", Some(&NAMED_ELEMENT));
pub static CLASS: Kind = Kind::new("Class", Some(&CLASSIFIER));
pub static COMPONENT: Kind = Kind::new("Component", Some(&CLASS));
pub static NODE: Kind = Kind::new("Node", Some(&CLASS));
pub static REQUIREMENT: Kind = Kind::new("Requirement", Some(&CLASS));
pub static INTERFACE: Kind = Kind::new("Interface", Some(&CLASSIFIER));
pub static ACTOR: Kind = Kind::new("Actor", Some(&CLASSIFIER));
pub static USE_CASE: Kind = Kind::new("UseCase", Some(&CLASSIFIER));
pub static ACTIVITY_NODE: Kind = Kind::new("ActivityNode", Some(&NAMED_ELEMENT));
pub static ACTION: Kind = Kind::new("Action", Some(&ACTIVITY_NODE));
pub static ACTIVITY_EDGE: Kind = Kind::new("ActivityEdge", Some(&NAMED_ELEMENT));
pub static CONTROL_FLOW: Kind = Kind::new("ControlFlow", Some(&ACTIVITY_EDGE));
pub static RELATIONSHIP: Kind = Kind::new("Relationship", Some(&ELEMENT));
pub static DIRECTED_RELATIONSHIP: Kind = Kind::new("DirectedRelationship", Some(&RELATIONSHIP));
pub static DEPENDENCY: Kind = Kind::new("Dependency", Some(&DIRECTED_RELATIONSHIP));
pub static INTERFACE_REALIZATION: Kind = Kind::new("InterfaceRealization", Some(&DEPENDENCY));
pub static GENERALIZATION: Kind = Kind::new("Generalization", Some(&DIRECTED_RELATIONSHIP));
pub static INCLUDE: Kind = Kind::new("Include", Some(&DIRECTED_RELATIONSHIP));
pub static EXTEND: Kind = Kind::new("Extend", Some(&DIRECTED_RELATIONSHIP));
pub static DIRECTED_RELATIONSHIP_PROPERTY_PATH: Kind =
    Kind::new("DirectedRelationshipPropertyPath", Some(&DIRECTED_RELATIONSHIP));
pub static SATISFY: Kind = Kind::new("Satisfy", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH));
pub static DERIVE_REQT: Kind = Kind::new("DeriveReqt", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH));
pub static TRACE: Kind = Kind::new("Trace", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH));
pub static VERIFY: Kind = Kind::new("Verify", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH));
pub static REFINE: Kind = Kind::new("Refine", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH));

// Diagram item kinds

pub static PRESENTATION: Kind = Kind::new("Presentation", None);
pub static ELEMENT_PRESENTATION: Kind = Kind::new("ElementPresentation", Some(&PRESENTATION));
pub static LINE_PRESENTATION: Kind = Kind::new("LinePresentation", Some(&PRESENTATION));

pub static CLASS_ITEM: Kind = Kind::new("ClassItem", Some(&ELEMENT_PRESENTATION));
pub static COMPONENT_ITEM: Kind = Kind::new("ComponentItem", Some(&ELEMENT_PRESENTATION));
pub static INTERFACE_ITEM: Kind = Kind::new("InterfaceItem", Some(&ELEMENT_PRESENTATION));
pub static PACKAGE_ITEM: Kind = Kind::new("PackageItem", Some(&ELEMENT_PRESENTATION));
pub static ACTOR_ITEM: Kind = Kind::new("ActorItem", Some(&ELEMENT_PRESENTATION));
pub static USE_CASE_ITEM: Kind = Kind::new("UseCaseItem", Some(&ELEMENT_PRESENTATION));
pub static ACTION_ITEM: Kind = Kind::new("ActionItem", Some(&ELEMENT_PRESENTATION));
pub static REQUIREMENT_ITEM: Kind = Kind::new("RequirementItem", Some(&ELEMENT_PRESENTATION));
pub static COMMENT_ITEM: Kind = Kind::new("CommentItem", Some(&ELEMENT_PRESENTATION));

pub static DEPENDENCY_ITEM: Kind = Kind::new("DependencyItem", Some(&LINE_PRESENTATION));
pub static GENERALIZATION_ITEM: Kind = Kind::new("GeneralizationItem", Some(&LINE_PRESENTATION));
pub static INTERFACE_REALIZATION_ITEM: Kind =
    Kind::new("InterfaceRealizationItem", Some(&LINE_PRESENTATION));
pub static INCLUDE_ITEM: Kind = Kind::new("IncludeItem", Some(&LINE_PRESENTATION));
pub static EXTEND_ITEM: Kind = Kind::new("ExtendItem", Some(&LINE_PRESENTATION));
pub static CONTROL_FLOW_ITEM: Kind = Kind::new("ControlFlowItem", Some(&LINE_PRESENTATION));
pub static COMMENT_LINE_ITEM: Kind = Kind::new("CommentLineItem", Some(&LINE_PRESENTATION));
pub static DIRECTED_RELATIONSHIP_PROPERTY_PATH_ITEM: Kind =
    Kind::new("DirectedRelationshipPropertyPathItem", Some(&LINE_PRESENTATION));
pub static SATISFY_ITEM: Kind = Kind::new("SatisfyItem", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH_ITEM));
pub static DERIVE_REQT_ITEM: Kind = Kind::new("DeriveReqtItem", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH_ITEM));
pub static TRACE_ITEM: Kind = Kind::new("TraceItem", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH_ITEM));
pub static VERIFY_ITEM: Kind = Kind::new("VerifyItem", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH_ITEM));
pub static REFINE_ITEM: Kind = Kind::new("RefineItem", Some(&DIRECTED_RELATIONSHIP_PROPERTY_PATH_ITEM));

pub static ALL_KINDS: &[&Kind] = &[
    &ELEMENT,
    &COMMENT,
    &NAMED_ELEMENT,
    &PACKAGE,
    &CLASSIFIER,
    &CLASS,
    &COMPONENT,
    &NODE,
    &REQUIREMENT,
    &INTERFACE,
    &ACTOR,
    &USE_CASE,
    &ACTIVITY_NODE,
    &ACTION,
    &ACTIVITY_EDGE,
    &CONTROL_FLOW,
    &RELATIONSHIP,
    &DIRECTED_RELATIONSHIP,
    &DEPENDENCY,
    &INTERFACE_REALIZATION,
    &GENERALIZATION,
    &INCLUDE,
    &EXTEND,
    &DIRECTED_RELATIONSHIP_PROPERTY_PATH,
    &SATISFY,
    &DERIVE_REQT,
    &TRACE,
    &VERIFY,
    &REFINE,
    &PRESENTATION,
    &ELEMENT_PRESENTATION,
    &LINE_PRESENTATION,
    &CLASS_ITEM,
    &COMPONENT_ITEM,
    &INTERFACE_ITEM,
    &PACKAGE_ITEM,
    &ACTOR_ITEM,
    &USE_CASE_ITEM,
    &ACTION_ITEM,
    &REQUIREMENT_ITEM,
    &COMMENT_ITEM,
    &DEPENDENCY_ITEM,
    &GENERALIZATION_ITEM,
    &INTERFACE_REALIZATION_ITEM,
    &INCLUDE_ITEM,
    &EXTEND_ITEM,
    &CONTROL_FLOW_ITEM,
    &COMMENT_LINE_ITEM,
    &DIRECTED_RELATIONSHIP_PROPERTY_PATH_ITEM,
    &SATISFY_ITEM,
    &DERIVE_REQT_ITEM,
    &TRACE_ITEM,
    &VERIFY_ITEM,
    &REFINE_ITEM,
];

// Roles

pub static OWNING_PACKAGE: Role = Role {
    owner: &ELEMENT,
    name: "owning_package",
    target: &PACKAGE,
    many: false,
    opposite: Some("packaged_element"),
};

pub static ANNOTATED_ELEMENT: Role = Role {
    owner: &COMMENT,
    name: "annotated_element",
    target: &ELEMENT,
    many: true,
    opposite: Some("comment"),
};

pub static DEPENDENCY_SUPPLIER: Role = Role {
    owner: &DEPENDENCY,
    name: "supplier",
    target: &NAMED_ELEMENT,
    many: true,
    opposite: Some("supplier_dependency"),
};

pub static DEPENDENCY_CLIENT: Role = Role {
    owner: &DEPENDENCY,
    name: "client",
    target: &NAMED_ELEMENT,
    many: true,
    opposite: Some("client_dependency"),
};

pub static INTERFACE_REALIZATION_CONTRACT: Role = Role {
    owner: &INTERFACE_REALIZATION,
    name: "contract",
    target: &INTERFACE,
    many: false,
    opposite: None,
};

pub static INTERFACE_REALIZATION_IMPLEMENTING: Role = Role {
    owner: &INTERFACE_REALIZATION,
    name: "implementing_classifier",
    target: &CLASSIFIER,
    many: false,
    opposite: Some("interface_realization"),
};

pub static GENERALIZATION_GENERAL: Role = Role {
    owner: &GENERALIZATION,
    name: "general",
    target: &CLASSIFIER,
    many: false,
    opposite: None,
};

pub static GENERALIZATION_SPECIFIC: Role = Role {
    owner: &GENERALIZATION,
    name: "specific",
    target: &CLASSIFIER,
    many: false,
    opposite: Some("generalization"),
};

pub static INCLUDE_ADDITION: Role = Role {
    owner: &INCLUDE,
    name: "addition",
    target: &USE_CASE,
    many: false,
    opposite: None,
};

pub static INCLUDE_INCLUDING_CASE: Role = Role {
    owner: &INCLUDE,
    name: "including_case",
    target: &USE_CASE,
    many: false,
    opposite: Some("include"),
};

pub static EXTEND_EXTENDED_CASE: Role = Role {
    owner: &EXTEND,
    name: "extended_case",
    target: &USE_CASE,
    many: false,
    opposite: None,
};

pub static EXTEND_EXTENSION: Role = Role {
    owner: &EXTEND,
    name: "extension",
    target: &USE_CASE,
    many: false,
    opposite: Some("extend"),
};

pub static ACTIVITY_EDGE_SOURCE: Role = Role {
    owner: &ACTIVITY_EDGE,
    name: "source",
    target: &ACTIVITY_NODE,
    many: false,
    opposite: Some("outgoing"),
};

pub static ACTIVITY_EDGE_TARGET: Role = Role {
    owner: &ACTIVITY_EDGE,
    name: "target",
    target: &ACTIVITY_NODE,
    many: false,
    opposite: Some("incoming"),
};

pub static PROPERTY_PATH_SOURCE_CONTEXT: Role = Role {
    owner: &DIRECTED_RELATIONSHIP_PROPERTY_PATH,
    name: "source_context",
    target: &CLASSIFIER,
    many: false,
    opposite: None,
};

pub static PROPERTY_PATH_TARGET_CONTEXT: Role = Role {
    owner: &DIRECTED_RELATIONSHIP_PROPERTY_PATH,
    name: "target_context",
    target: &CLASSIFIER,
    many: false,
    opposite: None,
};

pub static ALL_ROLES: &[&Role] = &[
    &OWNING_PACKAGE,
    &ANNOTATED_ELEMENT,
    &DEPENDENCY_SUPPLIER,
    &DEPENDENCY_CLIENT,
    &INTERFACE_REALIZATION_CONTRACT,
    &INTERFACE_REALIZATION_IMPLEMENTING,
    &GENERALIZATION_GENERAL,
    &GENERALIZATION_SPECIFIC,
    &INCLUDE_ADDITION,
    &INCLUDE_INCLUDING_CASE,
    &EXTEND_EXTENDED_CASE,
    &EXTEND_EXTENSION,
    &ACTIVITY_EDGE_SOURCE,
    &ACTIVITY_EDGE_TARGET,
    &PROPERTY_PATH_SOURCE_CONTEXT,
    &PROPERTY_PATH_TARGET_CONTEXT,
];

/// What a diagram item kind presents in the model
#[derive(Debug)]
pub struct Representation {
    pub item: &'static Kind,
    pub element: &'static Kind,
    /// Role set from the head end's subject (lines only)
    pub head: Option<&'static Role>,
    /// Role set from the tail end's subject (lines only)
    pub tail: Option<&'static Role>,
}

const fn shape(item: &'static Kind, element: &'static Kind) -> Representation {
    Representation {
        item,
        element,
        head: None,
        tail: None,
    }
}

const fn line(item: &'static Kind, element: &'static Kind, head: &'static Role, tail: &'static Role) -> Representation {
    Representation {
        item,
        element,
        head: Some(head),
        tail: Some(tail),
    }
}

pub static REPRESENTATIONS: &[Representation] = &[
    shape(&CLASS_ITEM, &CLASS),
    shape(&COMPONENT_ITEM, &COMPONENT),
    shape(&INTERFACE_ITEM, &INTERFACE),
    shape(&PACKAGE_ITEM, &PACKAGE),
    shape(&ACTOR_ITEM, &ACTOR),
    shape(&USE_CASE_ITEM, &USE_CASE),
    shape(&ACTION_ITEM, &ACTION),
    shape(&REQUIREMENT_ITEM, &REQUIREMENT),
    shape(&COMMENT_ITEM, &COMMENT),
    line(&DEPENDENCY_ITEM, &DEPENDENCY, &DEPENDENCY_SUPPLIER, &DEPENDENCY_CLIENT),
    line(&GENERALIZATION_ITEM, &GENERALIZATION, &GENERALIZATION_GENERAL, &GENERALIZATION_SPECIFIC),
    line(
        &INTERFACE_REALIZATION_ITEM,
        &INTERFACE_REALIZATION,
        &INTERFACE_REALIZATION_CONTRACT,
        &INTERFACE_REALIZATION_IMPLEMENTING,
    ),
    line(&INCLUDE_ITEM, &INCLUDE, &INCLUDE_ADDITION, &INCLUDE_INCLUDING_CASE),
    line(&EXTEND_ITEM, &EXTEND, &EXTEND_EXTENDED_CASE, &EXTEND_EXTENSION),
    line(&CONTROL_FLOW_ITEM, &CONTROL_FLOW, &ACTIVITY_EDGE_SOURCE, &ACTIVITY_EDGE_TARGET),
    line(&SATISFY_ITEM, &SATISFY, &PROPERTY_PATH_SOURCE_CONTEXT, &PROPERTY_PATH_TARGET_CONTEXT),
    line(&DERIVE_REQT_ITEM, &DERIVE_REQT, &PROPERTY_PATH_SOURCE_CONTEXT, &PROPERTY_PATH_TARGET_CONTEXT),
    line(&TRACE_ITEM, &TRACE, &PROPERTY_PATH_SOURCE_CONTEXT, &PROPERTY_PATH_TARGET_CONTEXT),
    line(&VERIFY_ITEM, &VERIFY, &PROPERTY_PATH_SOURCE_CONTEXT, &PROPERTY_PATH_TARGET_CONTEXT),
    line(&REFINE_ITEM, &REFINE, &PROPERTY_PATH_SOURCE_CONTEXT, &PROPERTY_PATH_TARGET_CONTEXT),
];

pub fn kind_by_name(name: &str) -> Option<&'static Kind> {
    ALL_KINDS.iter().copied().find(|k| k.name() == name)
}

/// Look up a role by its `Owner.name` path
pub fn role_by_path(path: &str) -> Option<&'static Role> {
    let (owner, name) = path.split_once('.')?;
    ALL_ROLES
        .iter()
        .copied()
        .find(|r| r.owner.name() == owner && r.name == name)
}

/// Representation declared for exactly this item kind
pub fn representation(item: &Kind) -> Option<&'static Representation> {
    REPRESENTATIONS.iter().find(|r| r.item == item)
}

/// Model element kind an item kind presents
pub fn model_element(item: &Kind) -> Option<&'static Kind> {
    representation(item).map(|r| r.element)
}

/// Head and tail roles of a line item kind
pub fn line_metadata(item: &Kind) -> Option<(&'static Role, &'static Role)> {
    let r = representation(item)?;
    Some((r.head?, r.tail?))
}

/// Roles declared on `kind` or its ancestors
pub fn roles_of(kind: &'static Kind) -> impl Iterator<Item = &'static Role> {
    ALL_ROLES.iter().copied().filter(move |r| kind.is_a(r.owner))
}

pub fn role(kind: &'static Kind, name: &str) -> Option<&'static Role> {
    roles_of(kind).find(|r| r.name == name)
}

/// Role on `kind` whose opposite collection is called `opposite`
pub fn role_with_opposite(kind: &'static Kind, opposite: &str) -> Option<&'static Role> {
    roles_of(kind).find(|r| r.opposite == Some(opposite))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_unique() {
        for (i, a) in ALL_KINDS.iter().enumerate() {
            for b in &ALL_KINDS[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn every_representation_item_is_a_presentation() {
        for r in REPRESENTATIONS {
            assert!(r.item.is_a(&PRESENTATION), "{}", r.item);
            assert_eq!(r.head.is_some(), r.item.is_a(&LINE_PRESENTATION), "{}", r.item);
            if let (Some(head), Some(tail)) = (r.head, r.tail) {
                assert!(r.element.is_a(head.owner));
                assert!(r.element.is_a(tail.owner));
            }
        }
    }

    #[test]
    fn line_metadata_lookup() {
        let (head, tail) = line_metadata(&DEPENDENCY_ITEM).unwrap();
        assert_eq!(head.name, "supplier");
        assert_eq!(tail.name, "client");
        assert!(line_metadata(&COMMENT_LINE_ITEM).is_none());
        assert!(line_metadata(&CLASS_ITEM).is_none());
    }

    #[test]
    fn inherited_roles_are_found() {
        assert_eq!(role(&SATISFY, "source_context"), Some(&PROPERTY_PATH_SOURCE_CONTEXT));
        assert_eq!(role(&CLASS, "owning_package"), Some(&OWNING_PACKAGE));
        assert!(role(&CLASS, "supplier").is_none());
        assert_eq!(
            role_with_opposite(&DEPENDENCY, "client_dependency"),
            Some(&DEPENDENCY_CLIENT)
        );
    }

    #[test]
    fn roles_resolve_by_path() {
        for role in ALL_ROLES {
            assert_eq!(role_by_path(&role.to_string()), Some(*role));
        }
        assert!(role_by_path("Dependency").is_none());
    }

    #[test]
    fn every_kind_resolves_by_name() {
        for kind in ALL_KINDS {
            assert_eq!(kind_by_name(kind.name()), Some(*kind));
        }
    }
}
