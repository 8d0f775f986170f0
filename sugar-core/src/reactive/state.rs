//! State Cells
//!
//! A state cell is a single reactive value owned by a host. Writes go through
//! a [`Setter`], which compares the new value with the stored one and only
//! stores it, and requests a host update, when the change predicate says it
//! changed. Equal writes are silent no-ops.
//!
//! Coalescing is the host's responsibility: several accepted writes in the
//! same turn each call `request_update`, and the host runs a single cycle in
//! which observers only ever see the last value written.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::host::Host;

use super::change::{ChangeDetect, ChangeFn};
use super::getter::Getter;

/// Options for [`use_state`].
pub struct StateOptions<T> {
    /// Replaces the default [`ChangeDetect`] comparison.
    pub has_changed: Option<ChangeFn<T>>,
}

impl<T> Default for StateOptions<T> {
    fn default() -> Self {
        Self { has_changed: None }
    }
}

struct StateCell<T> {
    value: RefCell<T>,
    has_changed: ChangeFn<T>,
    host: Weak<dyn Host>,
}

/// Write half of a state cell.
pub struct Setter<T> {
    cell: Rc<StateCell<T>>,
}

impl<T> Setter<T> {
    /// Stores `value` if it differs from the current one and requests a host
    /// update.
    ///
    /// Returns whether the value was accepted.
    pub fn set(&self, value: T) -> bool {
        let changed = (self.cell.has_changed)(&value, &*self.cell.value.borrow());
        if !changed {
            return false;
        }

        *self.cell.value.borrow_mut() = value;
        match self.cell.host.upgrade() {
            Some(host) => host.request_update(),
            None => tracing::warn!("state written after its host was dropped"),
        }

        true
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// Creates a reactive internal value owned by `host`.
///
/// The getter always returns the latest stored value.
pub fn use_state<H, T>(host: &Rc<H>, initial: T, options: StateOptions<T>) -> (Getter<T>, Setter<T>)
where
    H: Host + 'static,
    T: ChangeDetect + Clone + 'static,
{
    let has_changed: ChangeFn<T> = match options.has_changed {
        Some(has_changed) => has_changed,
        None => Rc::new(|value: &T, old: &T| value.has_changed(old)),
    };
    let host: Rc<dyn Host> = Rc::clone(host) as Rc<dyn Host>;

    let cell = Rc::new(StateCell {
        value: RefCell::new(initial),
        has_changed,
        host: Rc::downgrade(&host),
    });

    let getter = Getter::new({
        let cell = Rc::clone(&cell);
        move || cell.value.borrow().clone()
    });

    (getter, Setter { cell })
}
