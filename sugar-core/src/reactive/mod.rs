//! Reactive Primitives
//!
//! This module implements the state-and-effect layer that components use
//! from their setup code. Nothing here tracks dependencies automatically:
//! dependency lists are explicit, ordered collections of [`Getter`]s, and all
//! evaluation is driven by the host's update lifecycle.
//!
//! # Primitives
//!
//! ## State
//!
//! [`use_state`] creates a single mutable value. Writing an equal value is a
//! no-op; writing a different one requests a host update.
//!
//! ## Computed values
//!
//! [`use_computed`] memoizes a derivation of a dependency snapshot. It skips
//! recomputation when the inputs are unchanged and can optionally return the
//! previous output when a recomputation produced an equivalent value.
//!
//! ## Observers
//!
//! [`use_observer`] runs an effect after each update cycle in which its
//! dependencies changed, passing the new and previous snapshots.
//!
//! ## Listeners
//!
//! [`use_listener`] and [`use_conditional_listener`] manage event
//! subscriptions across the host's connect/disconnect transitions.
//!
//! # Change detection
//!
//! Every comparison goes through [`ChangeDetect`]. Floats treat `NaN` as
//! equal to itself and `Rc` compares by identity.

mod change;
mod computed;
mod deps;
mod getter;
mod listener;
mod observer;
mod state;

pub use change::{change_fn, not_equal, ChangeDetect, ChangeFn};
pub use computed::{use_computed, ComputedOptions};
pub use deps::{evaluate_dependencies, snapshot_changed, Dependencies};
pub use getter::Getter;
pub use listener::{
    use_conditional_listener, use_listener, ConditionalListenerConfig, ListenerConfig, Unsubscribe,
};
pub use observer::{use_observer, ObserverOptions};
pub use state::{use_state, Setter, StateOptions};
