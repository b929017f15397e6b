//! Model repository for modelink.
//!
//! Holds model elements, the diagrams presenting them and the revertible
//! events recording every change. Element and item types come from the
//! static [`metamodel`].

pub mod copypaste;
pub mod diagram;
pub mod element;
pub mod event;
pub mod kind;
pub mod metamodel;
pub mod model;

pub use copypaste::{CopyBuffer, PendingPaste, copy, paste, paste_model};
pub use diagram::{Diagram, DiagramId, DiagramView, Item, ItemSnapshot};
pub use element::{Element, ElementId, ElementSnapshot, Value};
pub use event::{ConnectionEvent, HandleConnection, ModelEvent};
pub use kind::{Kind, Role};
pub use model::{Model, UnlinkHook};
