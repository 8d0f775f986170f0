//! Portal
//!
//! A portal renders its content into a detached container and moves that
//! container under a different point of the document: the body by default,
//! an explicit element, the result of a resolver, or the portal itself.
//!
//! # Rendering
//!
//! `should_render = !disabled || disabling`. When `disabled` flips to `true`
//! and a `disable-delay` is configured, `disabling` stays `true` for that
//! long so exit transitions keep rendering. Re-enabling cancels the pending
//! transition immediately.
//!
//! # Placement
//!
//! Whenever `should_render` or the target changes, the container is detached
//! and, if it should render and the portal is connected, appended to the
//! resolved target. This happens on every change, not only the first one, so
//! the most recently shown portal ends up last in its target and stacks on
//! top.
//!
//! A portal must not have children of its own; content is passed through
//! [`PortalConfig::content`]. Connecting a portal with children fails with
//! [`Error::PortalMisuse`].

mod config;

use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::dom::{Document, Element};
use crate::error::{Error, Result};
use crate::host::{ComponentBuilder, ComponentHost, Host, HostExt, Template};
use crate::reactive::{
    use_computed, use_observer, use_state, ComputedOptions, Getter, ObserverOptions, Setter, StateOptions,
};
use crate::timer::{Scheduler, TimerHandle};

pub use config::{PortalConfig, Target};

pub const PORTAL_TAG: &str = "x-portal";
pub const LIGHT_DOM_PORTAL_TAG: &str = "x-portal-light-dom";

/// How content is encapsulated inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortalVariant {
    /// Content renders into a shadow root attached to the container.
    #[default]
    Shadow,
    /// Content renders directly into the container.
    LightDom,
}

impl PortalVariant {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Shadow => PORTAL_TAG,
            Self::LightDom => LIGHT_DOM_PORTAL_TAG,
        }
    }
}

type PortalHost = ComponentHost<PortalConfig>;

/// The `disabling` half of the exit transition state machine.
struct ExitTransition {
    scheduler: Rc<dyn Scheduler>,
    /// At most one pending timer; restarting clears the previous one.
    timer: Cell<Option<TimerHandle>>,
    set_disabling: Setter<bool>,
}

impl ExitTransition {
    /// Starts, or restarts, the delayed disable.
    fn start(self: &Rc<Self>, delay: Duration) {
        self.set_disabling.set(true);
        if let Some(previous) = self.timer.take() {
            self.scheduler.clear_timeout(previous);
        }

        let exit = Rc::downgrade(self);
        let handle = self.scheduler.set_timeout(
            delay,
            Box::new(move || {
                if let Some(exit) = exit.upgrade() {
                    exit.timer.set(None);
                    exit.set_disabling.set(false);
                    tracing::debug!("portal exit transition finished");
                }
            }),
        );
        self.timer.set(Some(handle));
        tracing::debug!(?delay, "portal exit transition started");
    }

    /// Cancels a pending transition and stops disabling right away.
    fn cancel(&self) {
        if let Some(handle) = self.timer.take() {
            self.scheduler.clear_timeout(handle);
            tracing::debug!("portal exit transition cancelled");
        }
        self.set_disabling.set(false);
    }
}

/// Resolves the element the container is appended to.
fn resolve_target(host: &PortalHost, target: &Target) -> Element {
    match target {
        Target::Body => host.element().document().body(),
        Target::Host => host.element().clone(),
        Target::Element(element) => element.clone(),
        Target::Resolver(resolve) => resolve().unwrap_or_else(|| host.element().clone()),
    }
}

/// Moves `container` under the resolved target. Always detaches first.
fn attach(host: &PortalHost, container: &Element, target: &Target) -> Result<()> {
    let target = resolve_target(host, target);
    container.remove();
    target.append_child(container)?;
    tracing::debug!(container = ?container, target = ?target, "portal attached");

    Ok(())
}

/// A portal component.
pub struct Portal {
    /// The host driving the portal's controllers.
    host: Rc<PortalHost>,
    /// Detached node moved under the resolved target.
    container: Element,
    /// `!disabled || disabling`.
    should_render: Getter<bool>,
    /// Whether an exit transition is pending.
    disabling: Getter<bool>,
}

impl Portal {
    pub fn new(
        document: &Rc<Document>,
        scheduler: Rc<dyn Scheduler>,
        variant: PortalVariant,
        config: PortalConfig,
    ) -> Result<Self> {
        let host = ComponentBuilder::new(variant.tag(), config)
            .render_root(move |element| {
                let container = element.document().create_element("div");
                match variant {
                    PortalVariant::Shadow => container.attach_shadow(),
                    PortalVariant::LightDom => Ok(container),
                }
            })
            .build(document)?;

        let render_root = host.render_root();
        let container = render_root.shadow_host().unwrap_or_else(|| render_root.clone());

        let (disabling, set_disabling) = use_state(&host, false, StateOptions::default());
        let disabled = host.prop(|config: &PortalConfig| config.disabled);
        let disable_delay = host.prop(|config: &PortalConfig| config.disable_delay());
        let target = host.prop(|config: &PortalConfig| config.target.clone());
        let content = host.prop(|config: &PortalConfig| config.content.clone());

        let should_render = use_computed(
            |(disabled, disabling): &(bool, bool)| !disabled || *disabling,
            (disabled.clone(), disabling.clone()),
            ComputedOptions::default(),
        );

        let exit = Rc::new(ExitTransition {
            scheduler,
            timer: Cell::new(None),
            set_disabling,
        });
        use_observer(
            &host,
            move |(disabled,): &(bool,), old: Option<&(bool,)>| {
                let was_disabled = old.map_or(false, |(old,)| *old);
                if *disabled {
                    if !was_disabled {
                        if let Some(delay) = disable_delay.get()? {
                            exit.start(delay);
                        }
                    }
                } else {
                    exit.cancel();
                }
                Ok(())
            },
            (disabled,),
            ObserverOptions {
                skip_first_render: true,
            },
        )?;

        let weak_host: Weak<PortalHost> = Rc::downgrade(&host);

        host.on_connect({
            let host = weak_host.clone();
            let container = container.clone();
            let should_render = should_render.clone();
            let target = target.clone();
            move || {
                let Some(host) = host.upgrade() else {
                    return Ok(());
                };

                let children = host
                    .element()
                    .children()
                    .into_iter()
                    .filter(|child| *child != container)
                    .count();
                if children > 0 {
                    container.remove();
                    return Err(Error::PortalMisuse { children });
                }

                if should_render.get()? {
                    attach(&host, &container, &target.get()?)?;
                }
                Ok(())
            }
        })?;

        host.on_disconnect({
            let container = container.clone();
            move || {
                container.remove();
                Ok(())
            }
        })?;

        use_observer(
            &host,
            {
                let host = weak_host;
                let container = container.clone();
                move |(should_render, target): &(bool, Target), _: Option<&(bool, Target)>| {
                    container.remove();
                    let Some(host) = host.upgrade() else {
                        return Ok(());
                    };
                    if *should_render && host.is_connected() {
                        attach(&host, &container, target)?;
                    }
                    Ok(())
                }
            },
            (should_render.clone(), target),
            ObserverOptions::default(),
        )?;

        host.set_render(Box::new({
            let should_render = should_render.clone();
            move || {
                if should_render.get()? {
                    content.get()
                } else {
                    Ok(None)
                }
            }
        }));

        Ok(Self {
            host,
            container,
            should_render,
            disabling,
        })
    }

    pub fn host(&self) -> &Rc<ComponentHost<PortalConfig>> {
        &self.host
    }

    pub fn element(&self) -> &Element {
        self.host.element()
    }

    /// The node moved between targets.
    pub fn container(&self) -> &Element {
        &self.container
    }

    /// The node content is rendered into. Same as the container for light
    /// DOM portals.
    pub fn render_root(&self) -> &Element {
        self.host.render_root()
    }

    pub fn should_render(&self) -> Result<bool> {
        self.should_render.get()
    }

    /// Whether an exit transition is in progress.
    pub fn is_disabling(&self) -> Result<bool> {
        self.disabling.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.host.set_props(|config| config.disabled = disabled);
    }

    pub fn set_disable_delay(&self, millis: Option<u64>) {
        self.host.set_props(|config| config.disable_delay = millis);
    }

    pub fn set_target(&self, target: Target) {
        self.host.set_props(|config| config.target = target);
    }

    pub fn set_content(&self, content: Option<Template>) {
        self.host.set_props(|config| config.content = content);
    }

    /// Mounts the portal element under `parent`.
    pub fn mount(&self, parent: &Element) -> Result<()> {
        self.host.mount(parent)
    }

    pub fn unmount(&self) -> Result<()> {
        self.host.unmount()
    }

    /// Runs pending update cycles.
    pub fn flush(&self) -> Result<usize> {
        self.host.flush()
    }
}

impl std::fmt::Debug for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("host", &self.host)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}
