//! Reference Host
//!
//! [`ComponentHost`] is a component instance living in a [`Document`]. It
//! owns typed props, a render root and a table of controllers, and drives
//! them through the lifecycle:
//!
//! 1. Construction requests the first update.
//! 2. [`ComponentHost::connect`] runs `host_connected` on every controller and
//!    enables updating.
//! 3. [`ComponentHost::perform_update`] runs one cycle: `host_update` on every
//!    controller, then the render function, then `host_updated` on every
//!    controller.
//! 4. [`ComponentHost::disconnect`] runs `host_disconnected`.
//!
//! `request_update` only raises a flag, so any number of requests made before
//! the next cycle collapse into that one cycle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::dom::{Document, Element, EventTarget};
use crate::error::Result;
use crate::reactive::{ChangeDetect, Getter};

use super::{ControllerId, Host, ReactiveController};

/// Upper bound on cycles run by a single [`ComponentHost::flush`].
const MAX_FLUSH_CYCLES: usize = 64;

/// Opaque rendered content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Template {
    markup: String,
}

impl Template {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

impl ChangeDetect for Template {
    fn has_changed(&self, old: &Self) -> bool {
        self != old
    }
}

/// Produces the content of the render root, `None` to render nothing.
pub type RenderFn = Box<dyn Fn() -> Result<Option<Template>>>;

type CreateRenderRoot = Box<dyn FnOnce(&Element) -> Result<Element>>;

/// A host that can be created through the element registry.
pub trait Component: Host {
    fn element(&self) -> Element;

    fn connect(&self) -> Result<()>;

    fn disconnect(&self) -> Result<()>;

    fn flush(&self) -> Result<usize>;
}

/// Builds a [`ComponentHost`].
pub struct ComponentBuilder<P> {
    tag: String,
    props: P,
    create_render_root: Option<CreateRenderRoot>,
}

impl<P: 'static> ComponentBuilder<P> {
    pub fn new(tag: impl Into<String>, props: P) -> Self {
        Self {
            tag: tag.into(),
            props,
            create_render_root: None,
        }
    }

    /// Overrides render root creation. The closure receives the host element.
    ///
    /// By default the render root is a shadow root attached to the host
    /// element.
    pub fn render_root<F>(mut self, create: F) -> Self
    where
        F: FnOnce(&Element) -> Result<Element> + 'static,
    {
        self.create_render_root = Some(Box::new(create));
        self
    }

    /// Creates the host and runs `setup` once. `setup` registers the
    /// component's controllers and returns its render function.
    pub fn setup<F>(self, document: &Rc<Document>, setup: F) -> Result<Rc<ComponentHost<P>>>
    where
        F: FnOnce(&Rc<ComponentHost<P>>) -> Result<Option<RenderFn>>,
    {
        let host = self.build(document)?;
        if let Some(render) = setup(&host)? {
            host.set_render(render);
        }

        Ok(host)
    }

    /// Creates the host without a render function.
    pub fn build(self, document: &Rc<Document>) -> Result<Rc<ComponentHost<P>>> {
        let element = document.create_element(&self.tag);
        let render_root = match self.create_render_root {
            Some(create) => create(&element)?,
            None => element.attach_shadow()?,
        };

        Ok(Rc::new_cyclic(|self_ref| ComponentHost {
            self_ref: self_ref.clone(),
            element,
            render_root,
            props: RefCell::new(self.props),
            controllers: RefCell::new(IndexMap::new()),
            render: RefCell::new(None),
            connected: Cell::new(false),
            enabled: Cell::new(false),
            updating: Cell::new(false),
            update_pending: Cell::new(true),
            update_requests: Cell::new(0),
            update_count: Cell::new(0),
        }))
    }
}

/// Reference implementation of [`Host`].
pub struct ComponentHost<P> {
    /// Weak self reference handed to prop getters.
    self_ref: Weak<ComponentHost<P>>,
    /// The element this component lives in.
    element: Element,
    /// Where the render function writes its output.
    render_root: Element,
    /// Typed inputs of the component.
    props: RefCell<P>,
    /// Registered controllers, in registration order.
    controllers: RefCell<IndexMap<ControllerId, Rc<dyn ReactiveController>>>,
    /// Produces the render root content on every cycle.
    render: RefCell<Option<RenderFn>>,
    /// Whether the host is currently connected.
    connected: Cell<bool>,
    /// Set on first successful connect. No cycle runs before that.
    enabled: Cell<bool>,
    /// Guards against a cycle starting from inside another one.
    updating: Cell<bool>,
    /// Raised by `request_update`, lowered when a cycle starts.
    update_pending: Cell<bool>,
    /// Total `request_update` calls.
    update_requests: Cell<usize>,
    /// Total completed cycles.
    update_count: Cell<usize>,
}

impl<P: 'static> ComponentHost<P> {
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Node the render function writes into.
    pub fn render_root(&self) -> &Element {
        &self.render_root
    }

    pub fn set_render(&self, render: RenderFn) {
        *self.render.borrow_mut() = Some(render);
    }

    /// Returns a getter for a property.
    ///
    /// The getter holds the host weakly; once the host is dropped it fails
    /// with `InvalidDependency`.
    pub fn prop<T, F>(&self, read: F) -> Getter<T>
    where
        T: 'static,
        F: Fn(&P) -> T + 'static,
    {
        Getter::from_weak(self.self_ref.clone(), move |host: &ComponentHost<P>| {
            read(&*host.props.borrow())
        })
    }

    pub fn with_props<R>(&self, f: impl FnOnce(&P) -> R) -> R {
        f(&*self.props.borrow())
    }

    /// Mutates the props and requests an update.
    pub fn set_props(&self, f: impl FnOnce(&mut P)) {
        f(&mut *self.props.borrow_mut());
        self.request_update();
    }

    /// Appends the host element under `parent`, then connects.
    pub fn mount(&self, parent: &Element) -> Result<()> {
        parent.append_child(&self.element)?;
        self.connect()
    }

    /// Disconnects, then detaches the host element.
    pub fn unmount(&self) -> Result<()> {
        self.disconnect()?;
        self.element.remove();
        Ok(())
    }

    pub fn connect(&self) -> Result<()> {
        if self.connected.replace(true) {
            return Ok(());
        }
        let was_enabled = self.enabled.replace(true);
        tracing::trace!(tag = %self.element.tag(), "host connected");

        let ids = self.controller_ids();
        for (done, id) in ids.iter().enumerate() {
            let Some(controller) = self.controller(id) else {
                continue;
            };
            if let Err(err) = controller.host_connected() {
                self.rollback_connect(&ids[..done], was_enabled);
                return Err(err);
            }
        }

        Ok(())
    }

    /// Undoes a connect that failed part way: controllers that already saw
    /// `host_connected` are disconnected again and the host stays
    /// disconnected.
    fn rollback_connect(&self, connected: &[ControllerId], was_enabled: bool) {
        self.connected.set(false);
        self.enabled.set(was_enabled);
        tracing::debug!(tag = %self.element.tag(), "connect failed, rolling back");

        for id in connected {
            if let Some(controller) = self.controller(id) {
                if let Err(err) = controller.host_disconnected() {
                    tracing::warn!(tag = %self.element.tag(), error = %err, "disconnect during rollback failed");
                }
            }
        }
    }

    pub fn disconnect(&self) -> Result<()> {
        if !self.connected.replace(false) {
            return Ok(());
        }
        tracing::trace!(tag = %self.element.tag(), "host disconnected");

        let ids = self.controller_ids();
        self.each_controller(&ids, |controller| controller.host_disconnected())
    }

    pub fn is_update_pending(&self) -> bool {
        self.update_pending.get()
    }

    /// Total number of `request_update` calls.
    pub fn update_requests(&self) -> usize {
        self.update_requests.get()
    }

    /// Total number of completed update cycles.
    pub fn update_count(&self) -> usize {
        self.update_count.get()
    }

    /// Runs one update cycle if one is pending. Returns whether a cycle ran.
    ///
    /// Controllers added during the cycle take part from the next one on.
    pub fn perform_update(&self) -> Result<bool> {
        if !self.enabled.get() || !self.update_pending.get() || self.updating.get() {
            return Ok(false);
        }

        self.updating.set(true);
        self.update_pending.set(false);
        let result = self.run_cycle();
        self.updating.set(false);

        result.map(|()| true)
    }

    /// Runs cycles until no update is pending.
    pub fn flush(&self) -> Result<usize> {
        let mut cycles = 0;
        while self.perform_update()? {
            cycles += 1;
            if cycles == MAX_FLUSH_CYCLES {
                tracing::warn!(
                    tag = %self.element.tag(),
                    cycles,
                    "updates kept being requested, giving up on this flush"
                );
                break;
            }
        }

        Ok(cycles)
    }

    fn run_cycle(&self) -> Result<()> {
        let ids = self.controller_ids();

        self.each_controller(&ids, |controller| controller.host_update())?;
        self.render_now()?;
        self.each_controller(&ids, |controller| controller.host_updated())?;

        self.update_count.set(self.update_count.get() + 1);
        tracing::trace!(tag = %self.element.tag(), cycle = self.update_count.get(), "update cycle");

        Ok(())
    }

    fn render_now(&self) -> Result<()> {
        let render = self.render.borrow();
        if let Some(render) = render.as_ref() {
            let template = render()?;
            self.render_root
                .set_text(template.map(|template| template.markup));
        }

        Ok(())
    }

    fn controller_ids(&self) -> Vec<ControllerId> {
        self.controllers.borrow().keys().copied().collect()
    }

    /// Invokes `f` on every controller in `ids` that is still registered.
    fn each_controller<F>(&self, ids: &[ControllerId], f: F) -> Result<()>
    where
        F: Fn(&dyn ReactiveController) -> Result<()>,
    {
        for id in ids {
            if let Some(controller) = self.controller(id) {
                f(controller.as_ref())?;
            }
        }

        Ok(())
    }

    fn controller(&self, id: &ControllerId) -> Option<Rc<dyn ReactiveController>> {
        self.controllers.borrow().get(id).cloned()
    }
}

impl<P: 'static> Host for ComponentHost<P> {
    fn add_controller(&self, controller: Rc<dyn ReactiveController>) -> Result<ControllerId> {
        let id = ControllerId::new();
        self.controllers
            .borrow_mut()
            .insert(id, Rc::clone(&controller));

        if self.connected.get() {
            controller.host_connected()?;
        }

        Ok(id)
    }

    fn remove_controller(&self, id: ControllerId) {
        self.controllers.borrow_mut().shift_remove(&id);
    }

    fn request_update(&self) {
        self.update_requests.set(self.update_requests.get() + 1);
        self.update_pending.set(true);
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn event_target(&self) -> Rc<dyn EventTarget> {
        Rc::new(self.element.clone())
    }
}

impl<P: 'static> Component for ComponentHost<P> {
    fn element(&self) -> Element {
        ComponentHost::element(self).clone()
    }

    fn connect(&self) -> Result<()> {
        ComponentHost::connect(self)
    }

    fn disconnect(&self) -> Result<()> {
        ComponentHost::disconnect(self)
    }

    fn flush(&self) -> Result<usize> {
        ComponentHost::flush(self)
    }
}

impl<P> fmt::Debug for ComponentHost<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHost")
            .field("element", &self.element)
            .field("connected", &self.connected.get())
            .field("controllers", &self.controllers.borrow().len())
            .field("updates", &self.update_count.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::host::HostExt;

    #[derive(Default)]
    struct Props {
        label: String,
    }

    fn labelled(document: &Rc<Document>) -> Rc<ComponentHost<Props>> {
        ComponentBuilder::new("x-label", Props::default())
            .setup(document, |host| {
                let label = host.prop(|props: &Props| props.label.clone());
                let render: RenderFn = Box::new(move || Ok(Some(Template::new(label.get()?))));
                Ok(Some(render))
            })
            .unwrap()
    }

    #[test]
    fn no_cycle_before_first_connect() {
        let document = Document::new();
        let host = labelled(&document);

        assert!(host.is_update_pending());
        assert_eq!(host.flush().unwrap(), 0);

        host.mount(&document.body()).unwrap();
        assert_eq!(host.flush().unwrap(), 1);
        assert!(!host.is_update_pending());
    }

    #[test]
    fn requests_collapse_into_one_cycle() {
        let document = Document::new();
        let host = labelled(&document);
        host.connect().unwrap();
        host.flush().unwrap();

        host.set_props(|props| props.label = String::from("a"));
        host.set_props(|props| props.label = String::from("b"));

        assert_eq!(host.flush().unwrap(), 1);
        assert_eq!(host.render_root().text().as_deref(), Some("b"));
    }

    #[test]
    fn pre_phases_run_before_post_phases() {
        let document = Document::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let host = ComponentBuilder::new("x-order", ())
            .setup(&document, |host| {
                for name in ["a", "b"] {
                    let pre = Rc::clone(&log);
                    host.on_pre_update(move || {
                        pre.borrow_mut().push(format!("pre-{name}"));
                        Ok(())
                    })?;
                    let post = Rc::clone(&log);
                    host.on_post_update(move || {
                        post.borrow_mut().push(format!("post-{name}"));
                        Ok(())
                    })?;
                }
                Ok(None)
            })
            .unwrap();

        host.connect().unwrap();
        host.flush().unwrap();

        assert_eq!(*log.borrow(), vec!["pre-a", "pre-b", "post-a", "post-b"]);
    }

    #[test]
    fn connect_hooks_run_once_per_transition() {
        let document = Document::new();
        let connects = Rc::new(Cell::new(0));
        let host = ComponentBuilder::new("x-hooks", ())
            .setup(&document, |host| {
                let connects = Rc::clone(&connects);
                host.on_connect(move || {
                    connects.set(connects.get() + 1);
                    Ok(())
                })?;
                Ok(None)
            })
            .unwrap();

        host.connect().unwrap();
        host.connect().unwrap();
        host.disconnect().unwrap();
        host.connect().unwrap();

        assert_eq!(connects.get(), 2);
    }

    #[test]
    fn failed_connect_is_rolled_back() {
        let document = Document::new();
        let disconnects = Rc::new(Cell::new(0));
        let host = ComponentBuilder::new("x-failing", ())
            .setup(&document, |host| {
                let counter = Rc::clone(&disconnects);
                host.on_disconnect(move || {
                    counter.set(counter.get() + 1);
                    Ok(())
                })?;
                host.on_connect(|| Err(Error::hierarchy("refused")))?;
                Ok(None)
            })
            .unwrap();

        assert!(matches!(host.connect(), Err(Error::HierarchyRequest { .. })));
        assert!(!host.is_connected());
        assert_eq!(disconnects.get(), 1);

        // Never connected, so nothing runs.
        assert_eq!(host.flush().unwrap(), 0);
    }

    #[test]
    fn props_getter_fails_after_host_drop() {
        let document = Document::new();
        let host = labelled(&document);
        let label = host.prop(|props: &Props| props.label.clone());
        drop(host);

        assert!(label.get().is_err());
    }
}
