//! Document tree.
//!
//! An arena of nodes owned by a [`Document`]. [`Element`] is a cheap handle
//! (document + node id) that compares by identity. Nodes are never freed;
//! detaching a node only clears its parent link.
//!
//! Every [`Element`] keeps its document alive, and the document owns the
//! listener [`Handler`]s. A handler that captures an `Element` (or anything
//! holding one) therefore forms an `Rc` cycle and the document is never
//! freed. Capture a [`Weak`](std::rc::Weak) document or remove the listener
//! when done.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::reactive::ChangeDetect;

use super::event::{Event, EventTarget, Handler, ListenerId};

/// Index of a node inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element { tag: String },
    ShadowRoot { host: NodeId },
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    shadow_root: Option<NodeId>,
    text: Option<String>,
    listeners: IndexMap<ListenerId, (String, Handler)>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: SmallVec::new(),
            shadow_root: None,
            text: None,
            listeners: IndexMap::new(),
        }
    }
}

/// Owner of every node. The body is created with the document and is the
/// root of the connected tree.
pub struct Document {
    nodes: RefCell<Vec<NodeData>>,
    body: NodeId,
}

impl Document {
    pub fn new() -> Rc<Self> {
        let body = NodeData::new(NodeKind::Element {
            tag: String::from("body"),
        });

        Rc::new(Self {
            nodes: RefCell::new(vec![body]),
            body: NodeId(0),
        })
    }

    pub fn body(self: &Rc<Self>) -> Element {
        self.element(self.body)
    }

    /// Creates a detached element.
    pub fn create_element(self: &Rc<Self>, tag: &str) -> Element {
        let id = self.push(NodeData::new(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        }));
        self.element(id)
    }

    /// Total number of nodes ever created.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    fn push(&self, node: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        NodeId(nodes.len() - 1)
    }

    fn element(self: &Rc<Self>, id: NodeId) -> Element {
        Element {
            document: Rc::clone(self),
            id,
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .finish_non_exhaustive()
    }
}

/// Handle to a node of a [`Document`].
#[derive(Clone)]
pub struct Element {
    document: Rc<Document>,
    id: NodeId,
}

impl Element {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    /// Lowercase tag name, or `#shadow-root` for shadow roots.
    pub fn tag(&self) -> String {
        match &self.with(|node| node.kind.clone()) {
            NodeKind::Element { tag } => tag.clone(),
            NodeKind::ShadowRoot { .. } => String::from("#shadow-root"),
        }
    }

    pub fn parent(&self) -> Option<Element> {
        self.with(|node| node.parent)
            .map(|id| self.document.element(id))
    }

    pub fn children(&self) -> Vec<Element> {
        self.with(|node| node.children.clone())
            .into_iter()
            .map(|id| self.document.element(id))
            .collect()
    }

    pub fn child_count(&self) -> usize {
        self.with(|node| node.children.len())
    }

    /// Appends `child` as the last child of `self`, moving it out of its
    /// current parent.
    pub fn append_child(&self, child: &Element) -> Result<()> {
        if !Rc::ptr_eq(&self.document, &child.document) {
            return Err(Error::hierarchy("node belongs to another document"));
        }
        if child.is_shadow_root() {
            return Err(Error::hierarchy("a shadow root cannot be appended"));
        }
        if child.contains(self) {
            return Err(Error::hierarchy("the new child is an ancestor of the parent"));
        }

        child.remove();

        let mut nodes = self.document.nodes.borrow_mut();
        nodes[self.id.0].children.push(child.id);
        nodes[child.id.0].parent = Some(self.id);
        tracing::trace!(parent = ?self.id, child = ?child.id, "append child");

        Ok(())
    }

    /// Detaches `self` from its parent. Returns `false` if it had none.
    pub fn remove(&self) -> bool {
        let mut nodes = self.document.nodes.borrow_mut();
        let Some(parent) = nodes[self.id.0].parent.take() else {
            return false;
        };
        nodes[parent.0].children.retain(|id| *id != self.id);
        tracing::trace!(?parent, child = ?self.id, "remove child");

        true
    }

    /// Whether `other` is `self` or one of its descendants. Does not cross
    /// shadow boundaries.
    pub fn contains(&self, other: &Element) -> bool {
        if !Rc::ptr_eq(&self.document, &other.document) {
            return false;
        }

        let nodes = self.document.nodes.borrow();
        let mut current = Some(other.id);
        while let Some(id) = current {
            if id == self.id {
                return true;
            }
            current = nodes[id.0].parent;
        }

        false
    }

    /// Whether the node is reachable from the body, crossing shadow roots
    /// through their host.
    pub fn is_connected(&self) -> bool {
        let nodes = self.document.nodes.borrow();
        let mut current = Some(self.id);
        while let Some(id) = current {
            if id == self.document.body {
                return true;
            }
            let node = &nodes[id.0];
            current = match node.kind {
                NodeKind::ShadowRoot { host } => Some(host),
                NodeKind::Element { .. } => node.parent,
            };
        }

        false
    }

    /// Attaches a shadow root to this element.
    pub fn attach_shadow(&self) -> Result<Element> {
        if self.is_shadow_root() {
            return Err(Error::hierarchy("a shadow root cannot host another shadow root"));
        }
        if self.shadow_root().is_some() {
            return Err(Error::hierarchy("element already hosts a shadow root"));
        }

        let shadow = self.document.push(NodeData::new(NodeKind::ShadowRoot { host: self.id }));
        self.document.nodes.borrow_mut()[self.id.0].shadow_root = Some(shadow);

        Ok(self.document.element(shadow))
    }

    pub fn shadow_root(&self) -> Option<Element> {
        self.with(|node| node.shadow_root)
            .map(|id| self.document.element(id))
    }

    /// For a shadow root, the element hosting it.
    pub fn shadow_host(&self) -> Option<Element> {
        match self.with(|node| node.kind.clone()) {
            NodeKind::ShadowRoot { host } => Some(self.document.element(host)),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn is_shadow_root(&self) -> bool {
        self.with(|node| matches!(node.kind, NodeKind::ShadowRoot { .. }))
    }

    pub fn text(&self) -> Option<String> {
        self.with(|node| node.text.clone())
    }

    pub fn set_text(&self, text: Option<String>) {
        self.document.nodes.borrow_mut()[self.id.0].text = text;
    }

    fn with<R>(&self, f: impl FnOnce(&NodeData) -> R) -> R {
        f(&self.document.nodes.borrow()[self.id.0])
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.document, &other.document) && self.id == other.id
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}#{}>", self.tag(), self.id.0)
    }
}

impl ChangeDetect for Element {
    fn has_changed(&self, old: &Self) -> bool {
        self != old
    }
}

impl EventTarget for Element {
    fn add_event_listener(&self, event: &str, handler: Handler) -> ListenerId {
        let id = ListenerId::new();
        self.document.nodes.borrow_mut()[self.id.0]
            .listeners
            .insert(id, (event.to_owned(), handler));
        tracing::debug!(node = ?self.id, event, listener = %id, "add event listener");

        id
    }

    fn remove_event_listener(&self, id: ListenerId) -> bool {
        let removed = self.document.nodes.borrow_mut()[self.id.0]
            .listeners
            .shift_remove(&id)
            .is_some();
        if removed {
            tracing::debug!(node = ?self.id, listener = %id, "remove event listener");
        }

        removed
    }

    fn dispatch_event(&self, event: &Event) -> usize {
        // Collect first: handlers may add or remove listeners.
        let handlers: Vec<Handler> = self.with(|node| {
            node.listeners
                .values()
                .filter(|(kind, _)| *kind == event.kind)
                .map(|(_, handler)| Rc::clone(handler))
                .collect()
        });

        for handler in &handlers {
            handler(event);
        }

        handlers.len()
    }

    fn listener_count(&self, event: &str) -> usize {
        self.with(|node| node.listeners.values().filter(|(kind, _)| kind == event).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn append_moves_between_parents() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");

        a.append_child(&child).unwrap();
        b.append_child(&child).unwrap();

        assert_eq!(child.parent(), Some(b.clone()));
        assert_eq!(a.child_count(), 0);
        assert_eq!(b.children(), vec![child]);
    }

    #[test]
    fn cannot_append_ancestor() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        outer.append_child(&inner).unwrap();

        assert!(matches!(
            inner.append_child(&outer),
            Err(Error::HierarchyRequest { .. })
        ));
        assert!(matches!(
            outer.append_child(&outer),
            Err(Error::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn remove_is_a_no_op_when_detached() {
        let doc = Document::new();
        let el = doc.create_element("div");

        assert!(!el.remove());
        doc.body().append_child(&el).unwrap();
        assert!(el.remove());
        assert!(el.parent().is_none());
    }

    #[test]
    fn connection_crosses_shadow_roots() {
        let doc = Document::new();
        let host = doc.create_element("x-host");
        let shadow = host.attach_shadow().unwrap();
        let inner = doc.create_element("p");
        shadow.append_child(&inner).unwrap();

        assert!(!inner.is_connected());
        doc.body().append_child(&host).unwrap();
        assert!(inner.is_connected());
        assert_eq!(shadow.shadow_host(), Some(host.clone()));
        assert!(host.attach_shadow().is_err());
    }

    #[test]
    fn dispatch_runs_matching_listeners() {
        let doc = Document::new();
        let el = doc.create_element("button");
        let clicks = Rc::new(Cell::new(0));

        let id = el.add_event_listener("click", {
            let clicks = Rc::clone(&clicks);
            Rc::new(move |_: &Event| clicks.set(clicks.get() + 1))
        });

        assert_eq!(el.dispatch_event(&Event::new("click")), 1);
        assert_eq!(el.dispatch_event(&Event::new("keydown")), 0);
        assert!(el.remove_event_listener(id));
        assert!(!el.remove_event_listener(id));
        assert_eq!(el.dispatch_event(&Event::new("click")), 0);
        assert_eq!(clicks.get(), 1);
    }
}
