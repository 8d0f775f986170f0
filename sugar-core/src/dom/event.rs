//! Events and event targets.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

/// A dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: String,
    pub detail: Value,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: Value::Null,
        }
    }

    pub fn with_detail(kind: impl Into<String>, detail: Value) -> Self {
        Self {
            kind: kind.into(),
            detail,
        }
    }
}

/// Callback invoked for every matching event.
pub type Handler = Rc<dyn Fn(&Event)>;

/// Identifies a single registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Something event listeners can be attached to.
pub trait EventTarget {
    fn add_event_listener(&self, event: &str, handler: Handler) -> ListenerId;

    /// Removes a listener. Returns `false` if it was not registered.
    fn remove_event_listener(&self, id: ListenerId) -> bool;

    /// Invokes every listener registered for `event.kind`, in registration
    /// order. Returns how many listeners ran.
    fn dispatch_event(&self, event: &Event) -> usize;

    /// Number of listeners registered for `event`.
    fn listener_count(&self, event: &str) -> usize;
}
