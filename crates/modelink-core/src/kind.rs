//! Static type descriptors for model elements and diagram items.
//!
//! Kinds form single-inheritance hierarchies that are fixed for the
//! lifetime of the process, which is what lets connector dispatch cache
//! its answers per kind pair.

use std::hash::{Hash, Hasher};

/// A model element or diagram item type
#[derive(Debug)]
pub struct Kind {
    name: &'static str,
    parent: Option<&'static Kind>,
}

impl Kind {
    pub const fn new(name: &'static str, parent: Option<&'static Kind>) -> Self {
        Self { name, parent }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static Kind> {
        self.parent
    }

    /// This kind followed by its ancestors, most derived first
    pub fn ancestors(&'static self) -> impl Iterator<Item = &'static Kind> {
        std::iter::successors(Some(self), |k| k.parent)
    }

    /// Whether this kind is `other` or descends from it
    pub fn is_a(&'static self, other: &Kind) -> bool {
        self.ancestors().any(|k| k == other)
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Kind {}

impl Hash for Kind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// An association end declared on a model element kind.
///
/// Setting a role on an element also records the element in the target's
/// `opposite` collection, when the role declares one.
#[derive(Debug)]
pub struct Role {
    pub owner: &'static Kind,
    pub name: &'static str,
    pub target: &'static Kind,
    pub many: bool,
    pub opposite: Option<&'static str>,
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name
    }
}

impl Eq for Role {}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// Serialize kinds by name, resolving them against the metamodel on load
pub mod serde_kind {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::Kind;
    use crate::metamodel;

    pub fn serialize<S: Serializer>(kind: &&'static Kind, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(kind.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<&'static Kind, D::Error> {
        let name = String::deserialize(deserializer)?;
        metamodel::kind_by_name(&name).ok_or_else(|| D::Error::custom(format!("unknown kind {}", name)))
    }
}

/// Serialize roles as `Owner.name`
pub mod serde_role {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::Role;
    use crate::metamodel;

    pub fn serialize<S: Serializer>(role: &&'static Role, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(role)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<&'static Role, D::Error> {
        let path = String::deserialize(deserializer)?;
        metamodel::role_by_path(&path).ok_or_else(|| D::Error::custom(format!("unknown role {}", path)))
    }
}

#[cfg(test)]
mod tests {
    use crate::metamodel::*;

    #[test]
    fn ancestors_are_most_derived_first() {
        let names: Vec<_> = COMPONENT.ancestors().map(|k| k.name()).collect();
        assert_eq!(names, ["Component", "Class", "Classifier", "NamedElement", "Element"]);
    }

    #[test]
    fn is_a_follows_hierarchy() {
        assert!(COMPONENT.is_a(&CLASSIFIER));
        assert!(!CLASSIFIER.is_a(&COMPONENT));
        assert!(!COMMENT.is_a(&NAMED_ELEMENT));
        assert!(DEPENDENCY_ITEM.is_a(&LINE_PRESENTATION));
    }
}
