//! Connectors whose line presents a relationship in the model.
//!
//! [`RelationshipConnect`] carries the shared algorithms: finding a
//! relationship that already links the two ends, creating one when none
//! exists, and cascading to whatever hangs off the line. Concrete
//! connectors implement [`SubjectConnector`] and call [`connect`] and
//! [`disconnect`] from their [`Connector`](crate::Connector) impl.

use anyhow::Result;
use tracing::{debug, warn};

use modelink_core::{CopyBuffer, ElementId, Item, Kind, Model, Role, copy, paste_model};
use modelink_geometry::{Connection, HandleIndex, ItemId, PortIndex};

use crate::connector::BaseConnector;
use crate::context::ConnectContext;

#[derive(Debug, Clone)]
pub struct RelationshipConnect {
    pub base: BaseConnector,
    /// The line's subject as it was when the connector was built
    copy_buffer: CopyBuffer,
}

impl RelationshipConnect {
    pub fn new(model: &Model, element: ItemId, line: ItemId) -> Self {
        let copy_buffer = model
            .subject(line)
            .map(|subject| copy(model, subject))
            .unwrap_or_default();
        Self {
            base: BaseConnector::new(model, element, line),
            copy_buffer,
        }
    }

    pub fn copy_buffer(&self) -> &CopyBuffer {
        &self.copy_buffer
    }

    fn connected_ends(&self, model: &Model) -> (ItemId, ItemId) {
        let head = self.base.get_connected(model, HandleIndex::HEAD);
        let tail = self.base.get_connected(model, HandleIndex::TAIL);
        let (Some(head), Some(tail)) = (head, tail) else {
            panic!("Line {} must be connected at both ends", self.base.line);
        };
        (head, tail)
    }

    /// Find a relationship of kind `required` between the subjects at the
    /// line's head and tail.
    ///
    /// The line's own subject is returned as is when it already links the
    /// two. Otherwise the tail subject's `tail.opposite` collection is
    /// searched; a relationship shown by another line on this diagram is
    /// skipped. First match in collection order wins.
    pub fn relationship(
        &self,
        model: &Model,
        required: &'static Kind,
        head: &'static Role,
        tail: &'static Role,
    ) -> Option<ElementId> {
        let line = self.base.line;
        let (line_head, line_tail) = self.connected_ends(model);
        let head_subject = model.subject(line_head);
        let tail_subject = model.subject(line_tail);

        if let Some(subject) = model.subject(line) {
            if model.role_matches(subject, head, head_subject) && model.role_matches(subject, tail, tail_subject) {
                return Some(subject);
            }
        }

        let (Some(head_subject), Some(tail_subject), Some(opposite)) = (head_subject, tail_subject, tail.opposite)
        else {
            return None;
        };

        let diagram = model.item(line).and_then(Item::diagram);
        model.opposites(tail_subject, opposite).iter().copied().find(|candidate| {
            model.kind_of(*candidate).is_some_and(|k| k.is_a(required))
                && model.role_matches(*candidate, head, Some(head_subject))
                && !model.lookup(*candidate).is_some_and(|relation| {
                    relation
                        .presentation()
                        .iter()
                        .any(|item| *item != line && model.item(*item).and_then(Item::diagram) == diagram)
                })
        })
    }

    /// Like [`RelationshipConnect::relationship`], but create the
    /// relationship when none is found, from the copy buffer if possible.
    /// Head and tail roles end up pointing at the subjects of the line's ends.
    pub fn relationship_or_new(
        &self,
        model: &mut Model,
        required: &'static Kind,
        head: &'static Role,
        tail: &'static Role,
    ) -> Result<ElementId> {
        if let Some(relation) = self.relationship(model, required, head, tail) {
            return Ok(relation);
        }

        let relation = match self.new_relation_from_copy(model, required)? {
            Some(relation) => relation,
            None => model.create(required)?,
        };
        assert!(
            model.kind_of(relation).is_some_and(|k| k.is_a(required)),
            "Relationship {} is not a {}",
            relation,
            required
        );

        let (line_head, line_tail) = self.connected_ends(model);
        let head_subject = model.subject(line_head);
        let tail_subject = model.subject(line_tail);
        model.replace_role(relation, head, head_subject)?;
        model.replace_role(relation, tail, tail_subject)?;
        debug!(%relation, kind = %required, line = %self.base.line, "relationship created");
        Ok(relation)
    }

    fn new_relation_from_copy(&self, model: &mut Model, required: &'static Kind) -> Result<Option<ElementId>> {
        if self.copy_buffer.is_empty() {
            return Ok(None);
        }
        let pasted = paste_model(model, &self.copy_buffer, self.base.diagram)?;
        let Some(relation) = pasted
            .into_iter()
            .find(|e| model.kind_of(*e).is_some_and(|k| k.is_a(required)))
        else {
            panic!("Copied elements, but no {} found", required);
        };
        Ok(Some(relation))
    }

    /// Have every item attached to the line connect again, now that the
    /// line's subject changed
    pub fn connect_connected_items(&self, cx: &mut ConnectContext<'_>) {
        let line = self.base.line;
        cx.model.solve(line);
        let peers: Vec<Connection> = cx
            .model
            .connections_to(line)
            .into_iter()
            .filter(|c| c.item != line)
            .collect();
        cx.cascade_connect(peers);
    }

    /// Disconnect every item attached to the line at model level.
    ///
    /// Returns the connections attached to the line, so they can be
    /// restored later.
    pub fn disconnect_connected_items(&self, cx: &mut ConnectContext<'_>) -> Vec<Connection> {
        cx.cascade_disconnect(self.base.line)
    }
}

/// A relationship connector with its type-specific subject handling
pub trait SubjectConnector {
    fn relation(&self) -> &RelationshipConnect;

    /// Establish the relationship at model level
    fn connect_subject(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex) -> bool;

    /// Drop the line's reference to its subject. The relationship itself stays.
    fn disconnect_subject(&self, cx: &mut ConnectContext<'_>, _handle: HandleIndex) {
        let line = self.relation().base.line;
        if let Err(err) = cx.model.set_subject(line, None) {
            warn!(%line, "can not clear subject: {:#}", err);
        }
    }
}

/// Connect one end; once both ends are attached the subject is resolved
/// and the line's peers re-evaluated.
pub fn connect<C: SubjectConnector + ?Sized>(
    connector: &C,
    cx: &mut ConnectContext<'_>,
    handle: HandleIndex,
    _port: PortIndex,
) -> bool {
    let base = connector.relation().base;
    if !base.connect() {
        return false;
    }
    let opposite = base.opposite(cx.model, handle);
    if base.get_connected(cx.model, opposite).is_some() {
        connector.connect_subject(cx, handle);
        if cx.model.subject(base.line).is_some() {
            connector.relation().connect_connected_items(cx);
        }
    }
    true
}

/// Disconnect one end; a line attached at both ends loses its subject
/// after its peers let go.
pub fn disconnect<C: SubjectConnector + ?Sized>(connector: &C, cx: &mut ConnectContext<'_>, handle: HandleIndex) {
    let base = connector.relation().base;
    let opposite = base.opposite(cx.model, handle);
    let handle_connected = base.get_connected(cx.model, handle).is_some();
    let opposite_connected = base.get_connected(cx.model, opposite).is_some();

    if handle_connected && opposite_connected {
        connector.relation().disconnect_connected_items(cx);
        connector.disconnect_subject(cx, handle);
    }
    base.disconnect();
}
