//! Connecting diagram lines to the items they attach to.
//!
//! A geometric connection (a line handle glued to a port) only has meaning
//! once a [`Connector`] has translated it into the model: a relationship
//! between the subjects at both ends, an annotation, or nothing at all.
//! Connectors are looked up per (target kind, line kind) pair in the
//! [`ConnectorRegistry`] and driven by [`HandleConnector`].

pub mod comment;
pub mod connector;
pub mod context;
pub mod directional;
pub mod metadata;
pub mod registry;
pub mod relationship;
pub mod tool;

pub use comment::CommentConnect;
pub use connector::{BaseConnector, Connector, NoConnector};
pub use context::ConnectContext;
pub use directional::DirectionalRelationshipConnect;
pub use metadata::MetadataRelationConnect;
pub use registry::{BuildConnector, ConnectorFactory, ConnectorRegistry};
pub use relationship::{RelationshipConnect, SubjectConnector};
pub use tool::{ConnectionSink, HandleConnector, UnlinkConnections, disconnect_item, unlink_item};
