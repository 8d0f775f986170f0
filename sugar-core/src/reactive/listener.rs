//! Event Listeners
//!
//! [`use_listener`] keeps a listener attached while the host is connected.
//! [`use_conditional_listener`] additionally guards it with a reactive
//! condition: a live subscription exists if and only if the host is connected
//! and the condition is `true`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dom::{EventTarget, Handler, ListenerId};
use crate::error::Result;
use crate::host::{ControllerId, Host, ReactiveController};

use super::getter::Getter;
use super::observer::{use_observer, ObserverOptions};

/// What to listen to.
#[derive(Clone)]
pub struct ListenerConfig {
    pub event: String,
    pub handler: Handler,
    /// Defaults to the host's own event target.
    pub target: Option<Rc<dyn EventTarget>>,
}

impl ListenerConfig {
    pub fn new(event: impl Into<String>, handler: Handler) -> Self {
        Self {
            event: event.into(),
            handler,
            target: None,
        }
    }

    pub fn on(mut self, target: Rc<dyn EventTarget>) -> Self {
        self.target = Some(target);
        self
    }
}

impl fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("event", &self.event)
            .field("has_target", &self.target.is_some())
            .finish_non_exhaustive()
    }
}

/// Attaches the listener on connect and detaches it on disconnect.
struct ListenerController {
    target: Rc<dyn EventTarget>,
    event: String,
    handler: Handler,
    listener: Cell<Option<ListenerId>>,
}

impl ListenerController {
    fn subscribe(&self) {
        if self.listener.get().is_none() {
            let id = self
                .target
                .add_event_listener(&self.event, Rc::clone(&self.handler));
            self.listener.set(Some(id));
        }
    }

    fn unsubscribe(&self) {
        if let Some(id) = self.listener.take() {
            self.target.remove_event_listener(id);
        }
    }
}

impl ReactiveController for ListenerController {
    fn host_connected(&self) -> Result<()> {
        self.subscribe();
        Ok(())
    }

    fn host_disconnected(&self) -> Result<()> {
        self.unsubscribe();
        Ok(())
    }
}

/// Handle returned by [`use_listener`].
pub struct Unsubscribe {
    controller: Rc<ListenerController>,
    host: Weak<dyn Host>,
    id: ControllerId,
}

impl Unsubscribe {
    /// Detaches the listener and removes its controller from the host.
    /// Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(host) = self.host.upgrade() {
            host.remove_controller(self.id);
        }
        self.controller.unsubscribe();
    }

    /// Whether the listener is currently attached to its target.
    pub fn is_subscribed(&self) -> bool {
        self.controller.listener.get().is_some()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("event", &self.controller.event)
            .field("controller", &self.id)
            .finish_non_exhaustive()
    }
}

/// Listens to `config.event` on `config.target` (or the host) while the host
/// is connected.
pub fn use_listener<H>(host: &Rc<H>, config: ListenerConfig) -> Result<Unsubscribe>
where
    H: Host + 'static,
{
    let target = config.target.unwrap_or_else(|| host.event_target());
    let controller = Rc::new(ListenerController {
        target,
        event: config.event,
        handler: config.handler,
        listener: Cell::new(None),
    });

    let id = host.add_controller(Rc::clone(&controller) as Rc<dyn ReactiveController>)?;
    let host: Rc<dyn Host> = Rc::clone(host) as Rc<dyn Host>;

    Ok(Unsubscribe {
        controller,
        host: Rc::downgrade(&host),
        id,
    })
}

/// Configuration for [`use_conditional_listener`].
#[derive(Debug, Clone)]
pub struct ConditionalListenerConfig {
    pub condition: Getter<bool>,
    pub listener: ListenerConfig,
}

struct ConditionalListener<H> {
    host: Weak<H>,
    condition: Getter<bool>,
    listener: ListenerConfig,
    subscription: RefCell<Option<Unsubscribe>>,
}

impl<H: Host + 'static> ConditionalListener<H> {
    fn subscribe(&self, host: &Rc<H>) -> Result<()> {
        if self.subscription.borrow().is_some() {
            return Ok(());
        }

        let subscription = use_listener(host, self.listener.clone())?;
        tracing::debug!(event = %self.listener.event, "conditional listener subscribed");
        *self.subscription.borrow_mut() = Some(subscription);

        Ok(())
    }

    fn unsubscribe(&self) {
        let subscription = self.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            tracing::debug!(event = %self.listener.event, "conditional listener unsubscribed");
        }
    }

    /// Re-establishes `subscribed == connected && condition`.
    fn sync(&self) -> Result<()> {
        let Some(host) = self.host.upgrade() else {
            self.unsubscribe();
            return Ok(());
        };

        if host.is_connected() && self.condition.get()? {
            self.subscribe(&host)
        } else {
            self.unsubscribe();
            Ok(())
        }
    }
}

impl<H: Host + 'static> ReactiveController for ConditionalListener<H> {
    fn host_connected(&self) -> Result<()> {
        if self.subscription.borrow().is_some() || !self.condition.get()? {
            return Ok(());
        }
        match self.host.upgrade() {
            Some(host) => self.subscribe(&host),
            None => Ok(()),
        }
    }

    fn host_disconnected(&self) -> Result<()> {
        self.unsubscribe();
        Ok(())
    }
}

/// Listens to an event only while `config.condition` is `true`.
///
/// The subscription is re-evaluated at bind time, after every update cycle in
/// which the condition changed, and on every connect and disconnect.
pub fn use_conditional_listener<H>(host: &Rc<H>, config: ConditionalListenerConfig) -> Result<()>
where
    H: Host + 'static,
{
    let listener = Rc::new(ConditionalListener {
        host: Rc::downgrade(host),
        condition: config.condition.clone(),
        listener: config.listener,
        subscription: RefCell::new(None),
    });

    if host.is_connected() && listener.condition.get()? {
        listener.subscribe(host)?;
    }

    use_observer(
        host,
        {
            let listener = Rc::clone(&listener);
            move |_: &(bool,), _: Option<&(bool,)>| listener.sync()
        },
        (config.condition,),
        ObserverOptions::default(),
    )?;

    host.add_controller(listener as Rc<dyn ReactiveController>)?;

    Ok(())
}
