//! Relationship lines whose model type and end roles come from the line
//! kind's "represents" metadata.

use modelink_core::metamodel::{line_metadata, model_element};
use modelink_core::Model;
use modelink_geometry::{HandleIndex, ItemId, PortIndex};
use tracing::{debug, warn};

use crate::connector::Connector;
use crate::context::ConnectContext;
use crate::directional::DirectionalRelationshipConnect;
use crate::registry::ConnectorFactory;
use crate::relationship::{self, RelationshipConnect, SubjectConnector};

/// Generic relationship connector driven by the line kind's declared
/// head and tail roles
#[derive(Debug, Clone)]
pub struct MetadataRelationConnect {
    directional: DirectionalRelationshipConnect,
}

fn build(model: &Model, element: ItemId, line: ItemId) -> Box<dyn Connector> {
    Box::new(MetadataRelationConnect::new(model, element, line))
}

fn build_with_self_loops(model: &Model, element: ItemId, line: ItemId) -> Box<dyn Connector> {
    Box::new(MetadataRelationConnect::with_self_loops(model, element, line))
}

impl MetadataRelationConnect {
    pub const FACTORY: ConnectorFactory = ConnectorFactory::new("MetadataRelationConnect", build);
    pub const SELF_LOOP_FACTORY: ConnectorFactory =
        ConnectorFactory::new("MetadataRelationConnect(self loops)", build_with_self_loops);

    pub fn new(model: &Model, element: ItemId, line: ItemId) -> Self {
        Self {
            directional: DirectionalRelationshipConnect::new(model, element, line, false),
        }
    }

    pub fn with_self_loops(model: &Model, element: ItemId, line: ItemId) -> Self {
        Self {
            directional: DirectionalRelationshipConnect::new(model, element, line, true),
        }
    }

    pub fn self_loops(&self) -> bool {
        self.directional.self_loops
    }
}

impl Connector for MetadataRelationConnect {
    fn allow(&self, model: &Model, handle: HandleIndex, port: PortIndex) -> bool {
        if !self.directional.allow(model, handle, port) {
            return false;
        }

        let base = &self.directional.relation.base;
        let Some((head, tail)) = model.item_kind(base.line).and_then(line_metadata) else {
            return false;
        };
        let (near, far) = if handle == HandleIndex::HEAD { (head, tail) } else { (tail, head) };
        let opposite = base.get_connected(model, base.opposite(model, handle));

        DirectionalRelationshipConnect::subject_fits(model, base.element, near)
            && opposite.is_none_or(|other| DirectionalRelationshipConnect::subject_fits(model, other, far))
    }

    fn connect(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex, port: PortIndex) -> bool {
        relationship::connect(self, cx, handle, port)
    }

    fn disconnect(&self, cx: &mut ConnectContext<'_>, handle: HandleIndex) {
        relationship::disconnect(self, cx, handle)
    }
}

impl SubjectConnector for MetadataRelationConnect {
    fn relation(&self) -> &RelationshipConnect {
        &self.directional.relation
    }

    fn connect_subject(&self, cx: &mut ConnectContext<'_>, _handle: HandleIndex) -> bool {
        let line = self.relation().base.line;
        let Some(kind) = cx.model.item_kind(line) else {
            return false;
        };
        let (Some(required), Some((head, tail))) = (model_element(kind), line_metadata(kind)) else {
            debug!(%line, %kind, "no relationship metadata");
            return false;
        };

        let relation = match self.relation().relationship_or_new(cx.model, required, head, tail) {
            Ok(relation) => relation,
            Err(err) => {
                warn!(%line, "can not resolve relationship: {:#}", err);
                return false;
            }
        };
        if let Err(err) = cx.model.set_subject(line, Some(relation)) {
            warn!(%line, %relation, "can not set subject: {:#}", err);
            return false;
        }
        true
    }
}
