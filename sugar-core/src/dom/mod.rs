//! Minimal Document Model
//!
//! Just enough of a document tree for components to live in: elements with
//! parents and children, shadow roots, text content and event listeners.
//! There is no layout, styling or attribute handling.

mod document;
mod event;

pub use document::{Document, Element, NodeId};
pub use event::{Event, EventTarget, Handler, ListenerId};
