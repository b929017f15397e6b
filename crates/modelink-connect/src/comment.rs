//! Comment lines: annotate an element, or the relationship shown by a
//! line, with a comment.

use modelink_core::metamodel::{ANNOTATED_ELEMENT, COMMENT, COMMENT_LINE_ITEM};
use modelink_core::{ElementId, Model};
use modelink_geometry::{HandleIndex, ItemId, PortIndex};
use tracing::{trace, warn};

use crate::connector::{BaseConnector, Connector};
use crate::context::ConnectContext;
use crate::registry::ConnectorFactory;

#[derive(Debug, Clone, Copy)]
pub struct CommentConnect {
    pub base: BaseConnector,
    /// The element end is itself a line
    to_line: bool,
}

fn build_element(model: &Model, element: ItemId, line: ItemId) -> Box<dyn Connector> {
    Box::new(CommentConnect::new(model, element, line, false))
}

fn build_line(model: &Model, element: ItemId, line: ItemId) -> Box<dyn Connector> {
    Box::new(CommentConnect::new(model, element, line, true))
}

fn is_comment(model: &Model, subject: Option<ElementId>) -> bool {
    subject
        .and_then(|s| model.kind_of(s))
        .is_some_and(|kind| kind.is_a(&COMMENT))
}

impl CommentConnect {
    pub const ELEMENT_FACTORY: ConnectorFactory = ConnectorFactory::new("CommentLineElementConnect", build_element);
    pub const LINE_FACTORY: ConnectorFactory = ConnectorFactory::new("CommentLineLineConnect", build_line);

    pub fn new(model: &Model, element: ItemId, line: ItemId, to_line: bool) -> Self {
        Self {
            base: BaseConnector::new(model, element, line),
            to_line,
        }
    }

    /// The (comment, annotated) subject pair once both ends are attached
    fn annotation(&self, model: &Model, handle: HandleIndex) -> Option<(ElementId, ElementId)> {
        let other = self.base.get_connected(model, self.base.opposite(model, handle))?;
        let here = model.subject(self.base.element)?;
        let there = model.subject(other)?;
        if is_comment(model, Some(here)) {
            Some((here, there))
        } else if is_comment(model, Some(there)) {
            Some((there, here))
        } else {
            None
        }
    }
}

impl Connector for CommentConnect {
    fn allow(&self, model: &Model, handle: HandleIndex, _port: PortIndex) -> bool {
        let base = &self.base;
        if base.element == base.line {
            return false;
        }
        if self.to_line && model.item_kind(base.element).is_some_and(|k| k.is_a(&COMMENT_LINE_ITEM)) {
            return false;
        }

        if let Some(other) = base.get_connected(model, base.opposite(model, handle)) {
            if other == base.element {
                return false;
            }
            // exactly one end shows a comment
            let here = is_comment(model, model.subject(base.element));
            let there = is_comment(model, model.subject(other));
            if here == there {
                return false;
            }
        }

        base.allow(model)
    }

    fn connect(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex, _port: PortIndex) -> bool {
        if let Some((comment, annotated)) = self.annotation(cx.model, handle) {
            trace!(%comment, %annotated, line = %self.base.line, "annotate");
            if let Err(err) = cx.model.add_role(comment, &ANNOTATED_ELEMENT, annotated) {
                warn!(%comment, %annotated, "can not annotate: {:#}", err);
            }
        }
        true
    }

    fn disconnect(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex) {
        if self.base.get_connected(cx.model, handle).is_none() {
            return;
        }
        if let Some((comment, annotated)) = self.annotation(cx.model, handle) {
            trace!(%comment, %annotated, line = %self.base.line, "drop annotation");
            if let Err(err) = cx.model.remove_role(comment, &ANNOTATED_ELEMENT, annotated) {
                warn!(%comment, %annotated, "can not drop annotation: {:#}", err);
            }
        }
    }
}
