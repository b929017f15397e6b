//! Canvas geometry for modelink.
//!
//! This crate is the geometric half of a diagram: item handles and ports,
//! the registry of which handle is attached to which port, and the solver
//! that keeps attached handles on their ports. It knows nothing about the
//! model; items are only identified by [`ItemId`].

pub mod canvas;
pub mod connections;
pub mod item;
pub mod position;
pub mod solver;

pub use canvas::Canvas;
pub use connections::{Connection, Connections};
pub use item::{Handle, HandleIndex, ItemGeometry, ItemId, Port, PortIndex};
pub use position::Position;
pub use solver::{ConstraintId, PortConstraint, Solver};
