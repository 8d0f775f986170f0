//! Change Observers
//!
//! An observer runs an effect after an update cycle whenever its dependency
//! snapshot changed. It works in two phases synchronized to the host:
//!
//! ```text
//! Idle --host_update--> Captured --host_updated--> Idle
//!        (evaluate deps         (compare with previous,
//!         into pending)          maybe run effect)
//! ```
//!
//! Splitting capture from effect means every observer of a host snapshots
//! its inputs before any effect of the cycle runs, so effects cannot leak
//! into a sibling's evaluation.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::host::{ControllerId, Host, ReactiveController};

use super::deps::{snapshot_changed, Dependencies};

/// Options for [`use_observer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverOptions {
    /// Never run the effect on the first cycle.
    pub skip_first_render: bool,
}

struct ObserverState<S> {
    /// Snapshot of the previous cycle.
    previous: Option<S>,
    /// Snapshot of the current cycle, only present between the two phases.
    pending: Option<S>,
    first_render: bool,
}

struct Observer<D: Dependencies, F> {
    deps: D,
    effect: RefCell<F>,
    state: RefCell<ObserverState<D::Snapshot>>,
    skip_first_render: bool,
}

impl<D, F> ReactiveController for Observer<D, F>
where
    D: Dependencies,
    F: FnMut(&D::Snapshot, Option<&D::Snapshot>) -> Result<()>,
{
    fn host_update(&self) -> Result<()> {
        let snapshot = self.deps.evaluate()?;
        self.state.borrow_mut().pending = Some(snapshot);

        Ok(())
    }

    fn host_updated(&self) -> Result<()> {
        let (pending, previous, skip) = {
            let mut state = self.state.borrow_mut();
            let skip = state.first_render && self.skip_first_render;
            state.first_render = false;

            let pending = state.pending.take().ok_or(Error::ObserverProtocolViolation)?;
            (pending, state.previous.take(), skip)
        };

        let result = if !skip && snapshot_changed(&pending, previous.as_ref()) {
            tracing::trace!("observer dependencies changed, running effect");
            (&mut *self.effect.borrow_mut())(&pending, previous.as_ref())
        } else {
            Ok(())
        };

        self.state.borrow_mut().previous = Some(pending);
        result
    }
}

/// Observes `deps` and calls `effect(new, old)` after every update cycle in
/// which they changed.
///
/// The effect always runs on the first cycle, since there is no previous
/// snapshot, unless [`ObserverOptions::skip_first_render`] is set.
pub fn use_observer<H, D, F>(host: &Rc<H>, effect: F, deps: D, options: ObserverOptions) -> Result<ControllerId>
where
    H: Host + 'static,
    D: Dependencies,
    F: FnMut(&D::Snapshot, Option<&D::Snapshot>) -> Result<()> + 'static,
{
    host.add_controller(Rc::new(Observer {
        deps,
        effect: RefCell::new(effect),
        state: RefCell::new(ObserverState {
            previous: None,
            pending: None,
            first_render: true,
        }),
        skip_first_render: options.skip_first_render,
    }))
}
