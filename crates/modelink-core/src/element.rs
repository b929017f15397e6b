//! Model elements: typed objects with attributes and role references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use modelink_geometry::ItemId;

use crate::kind::{Kind, serde_kind};

/// Model element identifier - UUID for global uniqueness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// A model element
#[derive(Debug, Clone)]
pub struct Element {
    id: ElementId,
    kind: &'static Kind,
    pub(crate) attributes: BTreeMap<String, Value>,
    /// Values of the roles this element owns, keyed by role name
    pub(crate) references: BTreeMap<&'static str, Vec<ElementId>>,
    /// Elements referring to this one, keyed by opposite name
    pub(crate) opposites: BTreeMap<&'static str, Vec<ElementId>>,
    /// Diagram items presenting this element
    pub(crate) presentation: Vec<ItemId>,
}

impl Element {
    pub(crate) fn new(id: ElementId, kind: &'static Kind) -> Self {
        Self {
            id,
            kind,
            attributes: BTreeMap::new(),
            references: BTreeMap::new(),
            opposites: BTreeMap::new(),
            presentation: Vec::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> &'static Kind {
        self.kind
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn name(&self) -> Option<&str> {
        match self.attributes.get("name") {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn references(&self, role: &str) -> &[ElementId] {
        self.references.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn opposites(&self, opposite: &str) -> &[ElementId] {
        self.opposites.get(opposite).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn presentation(&self) -> &[ItemId] {
        &self.presentation
    }

    /// Attributes and owned references, detached from the model
    pub fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            id: self.id,
            kind: self.kind,
            attributes: self.attributes.clone(),
            references: self
                .references
                .iter()
                .filter(|(_, values)| !values.is_empty())
                .map(|(role, values)| (role.to_string(), values.clone()))
                .collect(),
        }
    }
}

/// Serializable copy of one element, as held in a copy buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub id: ElementId,
    #[serde(with = "serde_kind")]
    pub kind: &'static Kind,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub references: BTreeMap<String, Vec<ElementId>>,
}
