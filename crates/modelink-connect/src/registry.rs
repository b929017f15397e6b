//! Connector dispatch table.
//!
//! Connectors are registered per (target kind, line kind) pair. Resolution
//! walks both kinds' ancestor chains, target outer and line inner, most
//! derived first, so an exact pair always beats a pair of ancestors.

use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::IndexMap;
use modelink_core::metamodel::{COMMENT_LINE_ITEM, CONTROL_FLOW_ITEM, ELEMENT_PRESENTATION, LINE_PRESENTATION};
use modelink_core::{Kind, Model};
use modelink_geometry::ItemId;
use tracing::debug;

use crate::comment::CommentConnect;
use crate::connector::{Connector, NoConnector};
use crate::metadata::MetadataRelationConnect;

type KindPair = (&'static str, &'static str);

/// Builds a connector for `(model, element, line)`
pub type BuildConnector = fn(&Model, ItemId, ItemId) -> Box<dyn Connector>;

/// A named connector constructor
#[derive(Clone, Copy)]
pub struct ConnectorFactory {
    name: &'static str,
    build: BuildConnector,
}

fn no_connector(_model: &Model, _element: ItemId, _line: ItemId) -> Box<dyn Connector> {
    Box::new(NoConnector)
}

impl ConnectorFactory {
    /// Forbids every connection
    pub const NONE: ConnectorFactory = ConnectorFactory::new("NoConnector", no_connector);

    pub const fn new(name: &'static str, build: BuildConnector) -> Self {
        Self { name, build }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_none(&self) -> bool {
        self.name == Self::NONE.name
    }

    pub fn build(&self, model: &Model, element: ItemId, line: ItemId) -> Box<dyn Connector> {
        (self.build)(model, element, line)
    }
}

impl std::fmt::Debug for ConnectorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConnectorFactory").field(&self.name).finish()
    }
}

#[derive(Debug)]
pub struct ConnectorRegistry {
    entries: IndexMap<KindPair, ConnectorFactory>,
    /// `can_connect` answers; kinds are static so entries stay valid
    /// until the table changes
    cache: RefCell<HashMap<KindPair, bool>>,
}

impl ConnectorRegistry {
    /// An empty table: everything resolves to [`ConnectorFactory::NONE`]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The stock table
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(&ELEMENT_PRESENTATION, &LINE_PRESENTATION, MetadataRelationConnect::FACTORY);
        registry.register(
            &ELEMENT_PRESENTATION,
            &CONTROL_FLOW_ITEM,
            MetadataRelationConnect::SELF_LOOP_FACTORY,
        );
        registry.register(&ELEMENT_PRESENTATION, &COMMENT_LINE_ITEM, CommentConnect::ELEMENT_FACTORY);
        registry.register(&LINE_PRESENTATION, &COMMENT_LINE_ITEM, CommentConnect::LINE_FACTORY);
        registry
    }

    /// Register a factory; an existing registration for the pair is replaced
    pub fn register(&mut self, target: &'static Kind, line: &'static Kind, factory: ConnectorFactory) {
        if let Some(previous) = self.entries.insert((target.name(), line.name()), factory) {
            debug!(%target, %line, previous = previous.name(), "replacing connector");
        }
        self.cache.get_mut().clear();
    }

    /// Most specific factory for the pair, or [`ConnectorFactory::NONE`]
    pub fn resolve(&self, target: &'static Kind, line: &'static Kind) -> ConnectorFactory {
        target
            .ancestors()
            .flat_map(|t| line.ancestors().map(move |l| (t.name(), l.name())))
            .find_map(|pair| self.entries.get(&pair).copied())
            .unwrap_or(ConnectorFactory::NONE)
    }

    /// Whether a connector other than the forbidding one is registered
    pub fn can_connect(&self, target: &'static Kind, line: &'static Kind) -> bool {
        let key = (target.name(), line.name());
        if let Some(answer) = self.cache.borrow().get(&key) {
            return *answer;
        }
        let answer = !self.resolve(target, line).is_none();
        self.cache.borrow_mut().insert(key, answer);
        answer
    }

    /// Build the connector for two items of the model
    pub fn connector(&self, model: &Model, element: ItemId, line: ItemId) -> Box<dyn Connector> {
        match (model.item_kind(element), model.item_kind(line)) {
            (Some(target), Some(line_kind)) => self.resolve(target, line_kind).build(model, element, line),
            _ => Box::new(NoConnector),
        }
    }

    /// Registered pairs in registration order: (target, line, connector)
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str, &'static str)> + '_ {
        self.entries
            .iter()
            .map(|((target, line), factory)| (*target, *line, factory.name()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
