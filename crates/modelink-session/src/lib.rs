//! Editing sessions for modelink.
//!
//! A [`Session`] owns a model together with the connector table used to
//! connect its lines and the [`UndoManager`] that turns recorded model
//! events into undo steps.

pub mod session;
pub mod undo;

pub use session::{Session, SessionOptions};
pub use undo::{Transaction, UndoManager};
