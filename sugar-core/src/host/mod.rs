//! Host Lifecycle Contract
//!
//! The reactive primitives never drive themselves. They are attached to a
//! [`Host`] as [`ReactiveController`]s and the host calls into them:
//!
//! - `host_connected` once per mount,
//! - `host_disconnected` once per unmount,
//! - `host_update` for every controller, then
//! - `host_updated` for every controller, once per update cycle.
//!
//! The one ordering guarantee the primitives rely on is that every
//! `host_update` of a cycle runs before any `host_updated` of the same cycle.
//!
//! [`ComponentHost`] is a small reference host that implements this contract
//! on top of the in-crate [`dom`](crate::dom) tree.

mod component;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dom::EventTarget;
use crate::error::Result;

pub use component::{Component, ComponentBuilder, ComponentHost, RenderFn, Template};

/// Identifies a controller registered on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u64);

impl ControllerId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle callbacks a host invokes on its controllers.
///
/// Every method defaults to a no-op so a controller only implements the
/// phases it cares about.
pub trait ReactiveController {
    fn host_connected(&self) -> Result<()> {
        Ok(())
    }

    fn host_disconnected(&self) -> Result<()> {
        Ok(())
    }

    /// Pre-update phase.
    fn host_update(&self) -> Result<()> {
        Ok(())
    }

    /// Post-update phase.
    fn host_updated(&self) -> Result<()> {
        Ok(())
    }
}

/// The component instance whose lifecycle drives reactive evaluation.
pub trait Host {
    /// Registers a controller.
    ///
    /// If the host is already connected the controller's `host_connected`
    /// runs immediately.
    fn add_controller(&self, controller: Rc<dyn ReactiveController>) -> Result<ControllerId>;

    /// Removes a controller. Unknown ids are ignored.
    fn remove_controller(&self, id: ControllerId);

    /// Schedules an update cycle. Idempotent until the cycle runs.
    fn request_update(&self);

    fn is_connected(&self) -> bool;

    /// Default target for event listeners.
    fn event_target(&self) -> Rc<dyn EventTarget>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connect,
    Disconnect,
    PreUpdate,
    PostUpdate,
}

type Hook = Box<dyn FnMut() -> Result<()>>;

/// A controller running a closure in a single lifecycle phase.
struct HookController {
    phase: Phase,
    hook: RefCell<Hook>,
}

impl HookController {
    fn run(&self, phase: Phase) -> Result<()> {
        if self.phase != phase {
            return Ok(());
        }
        (&mut *self.hook.borrow_mut())()
    }
}

impl fmt::Debug for HookController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookController")
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl ReactiveController for HookController {
    fn host_connected(&self) -> Result<()> {
        self.run(Phase::Connect)
    }

    fn host_disconnected(&self) -> Result<()> {
        self.run(Phase::Disconnect)
    }

    fn host_update(&self) -> Result<()> {
        self.run(Phase::PreUpdate)
    }

    fn host_updated(&self) -> Result<()> {
        self.run(Phase::PostUpdate)
    }
}

/// Closure-based hook registration for any [`Host`].
pub trait HostExt: Host {
    /// Runs `f` each time the host is connected.
    fn on_connect<F>(&self, f: F) -> Result<ControllerId>
    where
        F: FnMut() -> Result<()> + 'static,
    {
        add_hook(self, Phase::Connect, Box::new(f))
    }

    /// Runs `f` each time the host is disconnected.
    fn on_disconnect<F>(&self, f: F) -> Result<ControllerId>
    where
        F: FnMut() -> Result<()> + 'static,
    {
        add_hook(self, Phase::Disconnect, Box::new(f))
    }

    /// Runs `f` in the pre-update phase of every cycle.
    fn on_pre_update<F>(&self, f: F) -> Result<ControllerId>
    where
        F: FnMut() -> Result<()> + 'static,
    {
        add_hook(self, Phase::PreUpdate, Box::new(f))
    }

    /// Runs `f` in the post-update phase of every cycle.
    fn on_post_update<F>(&self, f: F) -> Result<ControllerId>
    where
        F: FnMut() -> Result<()> + 'static,
    {
        add_hook(self, Phase::PostUpdate, Box::new(f))
    }
}

impl<H: Host + ?Sized> HostExt for H {}

fn add_hook<H: Host + ?Sized>(host: &H, phase: Phase, hook: Hook) -> Result<ControllerId> {
    host.add_controller(Rc::new(HookController {
        phase,
        hook: RefCell::new(hook),
    }))
}
