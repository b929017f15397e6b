//! Scripted editing sessions.
//!
//! A scenario is a JSON document with a list of steps. Steps refer to what
//! earlier steps created by the names given in their `as` field. Every
//! step except `undo` and `redo` is committed as its own undo step.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use modelink_core::metamodel::{RELATIONSHIP, kind_by_name, model_element};
use modelink_core::{DiagramId, ElementId, Value};
use modelink_geometry::{HandleIndex, ItemId, PortIndex, Position};
use modelink_session::Session;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read scenario {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid scenario {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Line end named in a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum End {
    Head,
    Tail,
}

impl End {
    fn handle(self) -> HandleIndex {
        match self {
            End::Head => HandleIndex::HEAD,
            End::Tail => HandleIndex::TAIL,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Create a model element
    Element {
        kind: String,
        #[serde(rename = "as")]
        alias: Option<String>,
        #[serde(default)]
        attributes: BTreeMap<String, Value>,
    },
    Diagram {
        name: String,
        owner: Option<String>,
        #[serde(rename = "as")]
        alias: Option<String>,
    },
    /// Place an item. Shapes without a `subject` get a fresh element.
    Item {
        kind: String,
        diagram: String,
        #[serde(default)]
        at: (i32, i32),
        subject: Option<String>,
        #[serde(rename = "as")]
        alias: Option<String>,
    },
    Connect {
        line: String,
        end: End,
        to: String,
        port: Option<usize>,
    },
    Disconnect {
        line: String,
        end: End,
    },
    Unlink {
        item: String,
    },
    /// Set an attribute on an element, or on an item's subject
    Set {
        target: String,
        attribute: String,
        value: Option<Value>,
    },
    Undo,
    Redo,
}

impl Step {
    fn action(&self) -> &'static str {
        match self {
            Step::Element { .. } => "element",
            Step::Diagram { .. } => "diagram",
            Step::Item { .. } => "item",
            Step::Connect { .. } => "connect",
            Step::Disconnect { .. } => "disconnect",
            Step::Unlink { .. } => "unlink",
            Step::Set { .. } => "set",
            Step::Undo => "undo",
            Step::Redo => "redo",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Named {
    Element(ElementId),
    Diagram(DiagramId),
    Item(ItemId),
}

/// Outcome of one step
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub step: usize,
    pub action: &'static str,
    /// False when a connect was rejected or there was nothing to undo
    pub applied: bool,
}

#[derive(Debug, Serialize)]
pub struct ElementReport {
    pub id: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub presentation: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionReport {
    pub line: String,
    pub handle: usize,
    pub connected: String,
    pub port: usize,
}

/// Final state of a scenario run
#[derive(Debug, Serialize)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
    pub elements: Vec<ElementReport>,
    pub relationships: Vec<ElementReport>,
    pub connections: Vec<ConnectionReport>,
    pub undo: usize,
    pub redo: usize,
}

pub struct Runner {
    session: Session,
    names: HashMap<String, Named>,
    outcomes: Vec<Outcome>,
}

impl Runner {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            names: HashMap::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn run(&mut self, scenario: &Scenario) -> Result<()> {
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_no = index + 1;
            let applied = self
                .step(step)
                .with_context(|| format!("Step {} ({}) failed", step_no, step.action()))?;
            debug!(step = step_no, action = step.action(), applied, "step done");
            self.outcomes.push(Outcome {
                step: step_no,
                action: step.action(),
                applied,
            });
        }
        info!(steps = scenario.steps.len(), "scenario done");
        Ok(())
    }

    fn step(&mut self, step: &Step) -> Result<bool> {
        let applied = match step {
            Step::Element {
                kind,
                alias,
                attributes,
            } => {
                let kind = kind_by_name(kind).ok_or_else(|| anyhow!("Unknown kind {}", kind))?;
                let model = self.session.model_mut();
                let element = model.create(kind)?;
                for (name, value) in attributes {
                    model.set_attribute(element, name, Some(value.clone()))?;
                }
                self.bind(alias, Named::Element(element));
                true
            }
            Step::Diagram { name, owner, alias } => {
                let owner = owner.as_deref().map(|o| self.element(o)).transpose()?;
                let diagram = self.session.model_mut().create_diagram(name.clone(), owner);
                self.bind(alias, Named::Diagram(diagram));
                true
            }
            Step::Item {
                kind,
                diagram,
                at,
                subject,
                alias,
            } => {
                let kind = kind_by_name(kind).ok_or_else(|| anyhow!("Unknown kind {}", kind))?;
                let diagram = self.diagram(diagram)?;
                let subject = match subject {
                    Some(name) => Some(self.element(name)?),
                    None => None,
                };
                let model = self.session.model_mut();
                let item = model.create_item(diagram, kind, Position::new(at.0, at.1))?;
                let subject = match subject {
                    Some(subject) => Some(subject),
                    None if !model.item(item).is_some_and(|i| i.is_line()) => {
                        let element = model_element(kind).ok_or_else(|| anyhow!("{} presents nothing", kind))?;
                        Some(model.create(element)?)
                    }
                    None => None,
                };
                if subject.is_some() {
                    model.set_subject(item, subject)?;
                }
                self.bind(alias, Named::Item(item));
                true
            }
            Step::Connect { line, end, to, port } => {
                let line = self.item(line)?;
                let target = self.item(to)?;
                self.session
                    .connect(line, end.handle(), target, port.map(PortIndex))?
            }
            Step::Disconnect { line, end } => {
                let line = self.item(line)?;
                self.session.disconnect(line, end.handle())
            }
            Step::Unlink { item } => {
                let item = self.item(item)?;
                self.session.unlink_item(item)?;
                true
            }
            Step::Set {
                target,
                attribute,
                value,
            } => {
                let element = match self.lookup(target)? {
                    Named::Element(element) => element,
                    Named::Item(item) => self
                        .session
                        .model()
                        .subject(item)
                        .ok_or_else(|| anyhow!("{} has no subject", target))?,
                    Named::Diagram(_) => bail!("{} is a diagram", target),
                };
                self.session
                    .model_mut()
                    .set_attribute(element, attribute, value.clone())?;
                true
            }
            Step::Undo => return self.session.undo(),
            Step::Redo => return self.session.redo(),
        };
        self.session.commit();
        Ok(applied)
    }

    fn bind(&mut self, alias: &Option<String>, named: Named) {
        if let Some(alias) = alias {
            self.names.insert(alias.clone(), named);
        }
    }

    fn lookup(&self, name: &str) -> Result<Named> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Nothing is named {}", name))
    }

    fn element(&self, name: &str) -> Result<ElementId> {
        match self.lookup(name)? {
            Named::Element(element) => Ok(element),
            _ => bail!("{} is not an element", name),
        }
    }

    fn diagram(&self, name: &str) -> Result<DiagramId> {
        match self.lookup(name)? {
            Named::Diagram(diagram) => Ok(diagram),
            _ => bail!("{} is not a diagram", name),
        }
    }

    fn item(&self, name: &str) -> Result<ItemId> {
        match self.lookup(name)? {
            Named::Item(item) => Ok(item),
            _ => bail!("{} is not an item", name),
        }
    }

    /// Summarize the model, labelling everything with its scenario name
    /// where it has one
    pub fn report(&self) -> Report {
        let mut elements: HashMap<ElementId, String> = HashMap::new();
        let mut items: HashMap<ItemId, String> = HashMap::new();
        for (name, named) in &self.names {
            match named {
                Named::Element(id) => {
                    elements.insert(*id, name.clone());
                }
                Named::Item(id) => {
                    items.insert(*id, name.clone());
                }
                Named::Diagram(_) => {}
            }
        }
        let element_label = |id: ElementId| elements.get(&id).cloned().unwrap_or_else(|| id.to_string());
        let item_label = |id: ItemId| items.get(&id).cloned().unwrap_or_else(|| id.to_string());

        let model = self.session.model();
        let (relationships, elements): (Vec<_>, Vec<_>) = model
            .elements()
            .map(|element| {
                let snapshot = element.snapshot();
                ElementReport {
                    id: element_label(element.id()),
                    kind: element.kind().name(),
                    attributes: snapshot.attributes,
                    references: snapshot
                        .references
                        .into_iter()
                        .map(|(role, values)| (role, values.into_iter().map(element_label).collect()))
                        .collect(),
                    presentation: element.presentation().iter().copied().map(item_label).collect(),
                }
            })
            .partition(|report| kind_by_name(report.kind).is_some_and(|k| k.is_a(&RELATIONSHIP)));

        let connections = model
            .items()
            .flat_map(|item| model.connections_of(item.id()))
            .map(|c| ConnectionReport {
                line: item_label(c.item),
                handle: c.handle.0,
                connected: item_label(c.connected),
                port: c.port.0,
            })
            .collect();

        Report {
            outcomes: self.outcomes.clone(),
            elements,
            relationships,
            connections,
            undo: self.session.history().undo_count(),
            redo: self.session.history().redo_count(),
        }
    }
}
