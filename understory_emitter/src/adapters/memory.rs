// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory document implementing [`Host`](crate::host::Host).
//!
//! ## Feature
//!
//! Enable with `memory_host` (on by default).
//!
//! ## Model
//!
//! A [`MemoryDocument`] is a node arena rooted at a window and a document
//! (`body` is created up front). Elements carry a tag, an id, classes and
//! disabled/focusable bits; text, comment and plain-object nodes exist so
//! callers can exercise the "cannot carry bindings" and "not an element"
//! paths.
//!
//! The document also plays the platform: it stores one listener per
//! `(node, type)`, inline `on<type>` handlers and default actions, tracks
//! the focused element, and propagates native events with
//! [`dispatch_native`](MemoryDocument::dispatch_native).

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use serde_json::Value;

use super::selector::{ElementInfo, SelectorList, SelectorTree};
use crate::error::SelectorError;
use crate::event::{EventObject, NativeEvent};
use crate::handler::{Handler, HandlerOutput};
use crate::host::{Listener, Platform, Tree, ancestors};

/// Identifier of a node in a [`MemoryDocument`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// What a node is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The top of every propagation path.
    Window,
    /// The document; its parent is the window.
    Document,
    /// An element.
    Element,
    /// A text node (cannot carry bindings).
    Text,
    /// A comment node (cannot carry bindings).
    Comment,
    /// A plain object outside the tree.
    Object,
}

/// A default action run when an event is not prevented.
pub type DefaultAction = Rc<dyn Fn(NodeId)>;

const FOCUSABLE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea"];

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    disabled: bool,
    focusable: bool,
}

impl NodeData {
    fn new(kind: NodeKind, tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            focusable: FOCUSABLE_TAGS.contains(&tag.as_str()),
            tag,
            id: None,
            classes: Vec::new(),
            disabled: false,
        }
    }
}

#[derive(Debug, Default)]
struct Nodes(Vec<NodeData>);

impl Nodes {
    fn get(&self, node: NodeId) -> Option<&NodeData> {
        self.0.get(node.0 as usize)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.0.get_mut(node.0 as usize)
    }
}

impl SelectorTree<NodeId> for Nodes {
    fn element(&self, node: NodeId) -> Option<ElementInfo<'_>> {
        let data = self.get(node)?;
        (data.kind == NodeKind::Element).then(|| ElementInfo {
            tag: &data.tag,
            id: data.id.as_deref(),
            classes: &data.classes,
        })
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.get(node)?.parent?;
        (self.get(parent)?.kind == NodeKind::Element).then_some(parent)
    }
}

type Slot = (NodeId, String);

/// In-memory tree plus platform.
pub struct MemoryDocument {
    nodes: RefCell<Nodes>,
    selectors: RefCell<HashMap<String, Rc<SelectorList>>>,
    listeners: RefCell<HashMap<Slot, Listener<NodeId>>>,
    inline: RefCell<HashMap<Slot, Handler<NodeId>>>,
    defaults: RefCell<HashMap<Slot, DefaultAction>>,
    // Default actions currently running; a nested run of the same slot is skipped.
    running: RefCell<Vec<Slot>>,
    active: Cell<Option<NodeId>>,
    attached: Cell<usize>,
    detached: Cell<usize>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    const WINDOW: NodeId = NodeId(0);
    const DOCUMENT: NodeId = NodeId(1);
    const BODY: NodeId = NodeId(2);

    /// A document with a window, the document node and an empty `body`.
    pub fn new() -> Self {
        let mut window = NodeData::new(NodeKind::Window, "");
        window.children.push(Self::DOCUMENT);
        let mut document = NodeData::new(NodeKind::Document, "");
        document.parent = Some(Self::WINDOW);
        document.children.push(Self::BODY);
        let mut body = NodeData::new(NodeKind::Element, "body");
        body.parent = Some(Self::DOCUMENT);
        Self {
            nodes: RefCell::new(Nodes(alloc::vec![window, document, body])),
            selectors: RefCell::new(HashMap::new()),
            listeners: RefCell::new(HashMap::new()),
            inline: RefCell::new(HashMap::new()),
            defaults: RefCell::new(HashMap::new()),
            running: RefCell::new(Vec::new()),
            active: Cell::new(None),
            attached: Cell::new(0),
            detached: Cell::new(0),
        }
    }

    /// The window node.
    pub fn window(&self) -> NodeId {
        Self::WINDOW
    }

    /// The document node.
    pub fn document(&self) -> NodeId {
        Self::DOCUMENT
    }

    /// The `body` element.
    pub fn body(&self) -> NodeId {
        Self::BODY
    }

    fn push(&self, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(u32::try_from(nodes.0.len()).unwrap_or(u32::MAX));
        nodes.0.push(data);
        id
    }

    fn with_node<R>(&self, node: NodeId, f: impl FnOnce(&mut NodeData) -> R) -> Option<R> {
        self.nodes.borrow_mut().get_mut(node).map(f)
    }

    /// Creates a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.push(NodeData::new(NodeKind::Element, tag))
    }

    /// Creates a detached text node.
    pub fn create_text(&self) -> NodeId {
        self.push(NodeData::new(NodeKind::Text, ""))
    }

    /// Creates a detached comment node.
    pub fn create_comment(&self) -> NodeId {
        self.push(NodeData::new(NodeKind::Comment, ""))
    }

    /// Creates a plain object: it carries bindings but has no parent and is
    /// not an element.
    pub fn create_object(&self) -> NodeId {
        self.push(NodeData::new(NodeKind::Object, ""))
    }

    /// Creates an element with `classes` and appends it to `parent`.
    pub fn element(&self, parent: NodeId, tag: &str, classes: &[&str]) -> NodeId {
        let node = self.create_element(tag);
        for class in classes {
            self.add_class(node, class);
        }
        self.append(parent, node);
        node
    }

    /// Moves `child` to the end of `parent`'s children.
    pub fn append(&self, parent: NodeId, child: NodeId) {
        self.remove(child);
        let mut nodes = self.nodes.borrow_mut();
        if nodes.get(parent).is_none() {
            return;
        }
        if let Some(data) = nodes.get_mut(child) {
            data.parent = Some(parent);
        }
        if let Some(data) = nodes.get_mut(parent) {
            data.children.push(child);
        }
    }

    /// Detaches `node` from its parent.
    pub fn remove(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(parent) = nodes.get_mut(node).and_then(|d| d.parent.take()) else {
            return;
        };
        if let Some(data) = nodes.get_mut(parent) {
            data.children.retain(|&c| c != node);
        }
    }

    /// Sets the element id.
    pub fn set_id(&self, node: NodeId, id: &str) {
        self.with_node(node, |d| d.id = Some(id.to_string()));
    }

    /// Adds a class.
    pub fn add_class(&self, node: NodeId, class: &str) {
        self.with_node(node, |d| {
            if let Err(at) = d.classes.binary_search_by(|c| c.as_str().cmp(class)) {
                d.classes.insert(at, class.to_string());
            }
        });
    }

    /// Removes a class.
    pub fn remove_class(&self, node: NodeId, class: &str) {
        self.with_node(node, |d| d.classes.retain(|c| c != class));
    }

    /// Marks an element (un)disabled.
    pub fn set_disabled(&self, node: NodeId, disabled: bool) {
        self.with_node(node, |d| d.disabled = disabled);
    }

    /// Overrides whether an element can take focus.
    pub fn set_focusable(&self, node: NodeId, focusable: bool) {
        self.with_node(node, |d| d.focusable = focusable);
    }

    /// What `node` is.
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.borrow().get(node).map(|d| d.kind)
    }

    /// Parent of `node`.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node).and_then(|d| d.parent)
    }

    /// Children of `node`, in order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node)
            .map(|d| d.children.clone())
            .unwrap_or_default()
    }

    fn selector(&self, selector: &str) -> Result<Rc<SelectorList>, SelectorError> {
        if let Some(parsed) = self.selectors.borrow().get(selector) {
            return Ok(parsed.clone());
        }
        let parsed = Rc::new(SelectorList::parse(selector)?);
        self.selectors
            .borrow_mut()
            .insert(selector.to_string(), parsed.clone());
        Ok(parsed)
    }

    /// Descendants of `root` matching `selector`, in document order.
    pub fn find_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = self.selector(selector)?;
        let nodes = self.nodes.borrow();
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = nodes
            .get(root)
            .map(|d| d.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(node) = stack.pop() {
            if list.matches(&*nodes, node) {
                found.push(node);
            }
            if let Some(data) = nodes.get(node) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        Ok(found)
    }

    /// First descendant of `root` matching `selector`.
    pub fn find_one(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.find_all(root, selector)?.first().copied())
    }

    /// Sets the inline `on<ty>` handler of `node`.
    pub fn set_inline(&self, node: NodeId, ty: &str, handler: Handler<NodeId>) {
        self.inline
            .borrow_mut()
            .insert((node, ty.to_string()), handler);
    }

    /// Clears the inline `on<ty>` handler of `node`.
    pub fn clear_inline(&self, node: NodeId, ty: &str) {
        self.inline.borrow_mut().remove(&(node, ty.to_string()));
    }

    /// Sets the default action of `ty` on `node`.
    pub fn set_default_action(&self, node: NodeId, ty: &str, action: impl Fn(NodeId) + 'static) {
        self.defaults
            .borrow_mut()
            .insert((node, ty.to_string()), Rc::new(action));
    }

    /// Returns `true` if a listener for `ty` is attached to `node`.
    pub fn has_listener(&self, node: NodeId, ty: &str) -> bool {
        self.listeners
            .borrow()
            .contains_key(&(node, ty.to_string()))
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Total `add_listener` calls so far.
    pub fn attach_count(&self) -> usize {
        self.attached.get()
    }

    /// Total effective `remove_listener` calls so far.
    pub fn detach_count(&self) -> usize {
        self.detached.get()
    }

    /// Delivers `native` to `target` and, if it bubbles, to every ancestor.
    ///
    /// On each node the attached listener runs, then the inline handler
    /// (unless immediate propagation was stopped). Delivery ends when
    /// propagation is stopped. Afterwards the default action of the target
    /// runs unless the event was prevented or that action is already running.
    ///
    /// Returns `false` if the default was prevented.
    pub fn dispatch_native(&self, target: NodeId, native: &Rc<NativeEvent<NodeId>>) -> bool {
        let ty = native.ty().to_string();
        native.set_target(target);
        let mut path = alloc::vec![target];
        if native.bubbles() {
            path.extend(ancestors(self, target));
        }
        tracing::trace!(node = ?target, event_type = %ty, "native dispatch");

        for node in path {
            native.set_current_target(Some(node));
            let slot = (node, ty.clone());
            let listener = self.listeners.borrow().get(&slot).cloned();
            if let Some(listener) = listener {
                listener(node, native);
            }
            let inline = self.inline.borrow().get(&slot).cloned();
            if let Some(inline) = inline
                && !native.is_immediate_propagation_stopped()
            {
                let mut event = EventObject::from_native(native.clone());
                if inline.call(&mut event, &[]).is_false() {
                    native.prevent_default();
                }
            }
            if native.is_propagation_stopped() {
                break;
            }
        }
        native.set_current_target(None);

        if native.is_default_prevented() {
            return false;
        }
        self.run_default_action(target, &ty);
        true
    }

    /// Runs the default action of `ty` on `target`, unless one for the same
    /// slot is already running further up the stack.
    ///
    /// Returns `true` if an action ran.
    fn run_default_action(&self, target: NodeId, ty: &str) -> bool {
        let slot = (target, ty.to_string());
        if self.running.borrow().contains(&slot) {
            tracing::trace!(node = ?target, event_type = %ty, "default action already running; skipped");
            return false;
        }
        let Some(action) = self.defaults.borrow().get(&slot).cloned() else {
            return false;
        };
        self.running.borrow_mut().push(slot.clone());
        action(target);
        self.running.borrow_mut().retain(|s| *s != slot);
        true
    }

    /// Moves focus to `node`, firing `blur`/`focusout` on the previously
    /// focused element and `focus`/`focusin` on `node`.
    ///
    /// Returns `false` if `node` cannot take focus.
    pub fn focus(&self, node: NodeId) -> bool {
        let focusable = self
            .nodes
            .borrow()
            .get(node)
            .is_some_and(|d| d.kind == NodeKind::Element && d.focusable && !d.disabled);
        if !focusable {
            return false;
        }
        if self.active.get() == Some(node) {
            return true;
        }
        if let Some(previous) = self.active.get() {
            self.blur(previous);
        }
        self.active.set(Some(node));
        self.dispatch_native(node, &Rc::new(NativeEvent::init("focus", false, false)));
        self.dispatch_native(node, &Rc::new(NativeEvent::init("focusin", true, false)));
        true
    }

    /// Removes focus from `node`, firing `blur` and `focusout`.
    ///
    /// Returns `false` if `node` was not focused.
    pub fn blur(&self, node: NodeId) -> bool {
        if self.active.get() != Some(node) {
            return false;
        }
        self.active.set(None);
        self.dispatch_native(node, &Rc::new(NativeEvent::init("blur", false, false)));
        self.dispatch_native(node, &Rc::new(NativeEvent::init("focusout", true, false)));
        true
    }

    /// Navigates away: fires `beforeunload` on the window and, unless a
    /// handler set `returnValue` or prevented it, `unload`.
    ///
    /// Returns `false` if the unload was cancelled.
    pub fn unload(&self) -> bool {
        let before = Rc::new(NativeEvent::init("beforeunload", false, true));
        self.dispatch_native(Self::WINDOW, &before);
        let cancelled = before.is_default_prevented()
            || before
                .get("returnValue")
                .is_some_and(|v| !v.is_null());
        if cancelled {
            tracing::debug!("unload cancelled by beforeunload");
            return false;
        }
        self.dispatch_native(Self::WINDOW, &Rc::new(NativeEvent::new("unload")));
        true
    }
}

impl Tree<NodeId> for MemoryDocument {
    fn accepts_bindings(&self, node: NodeId) -> bool {
        !matches!(
            self.kind(node),
            Some(NodeKind::Text | NodeKind::Comment) | None
        )
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    fn is_window(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Window)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node)
    }

    fn matches(&self, element: NodeId, selector: &str) -> Result<bool, SelectorError> {
        let list = self.selector(selector)?;
        Ok(list.matches(&*self.nodes.borrow(), element))
    }

    fn is_disabled(&self, element: NodeId) -> bool {
        self.nodes.borrow().get(element).is_some_and(|d| d.disabled)
    }
}

impl Platform<NodeId> for MemoryDocument {
    fn add_listener(&self, target: NodeId, ty: &str, listener: Listener<NodeId>) {
        self.listeners
            .borrow_mut()
            .insert((target, ty.to_string()), listener);
        self.attached.set(self.attached.get() + 1);
    }

    fn remove_listener(&self, target: NodeId, ty: &str) {
        if self
            .listeners
            .borrow_mut()
            .remove(&(target, ty.to_string()))
            .is_some()
        {
            self.detached.set(self.detached.get() + 1);
        }
    }

    fn call_inline(
        &self,
        target: NodeId,
        ty: &str,
        event: &mut EventObject<NodeId>,
        args: &[Value],
    ) -> Option<HandlerOutput> {
        let inline = self.inline.borrow().get(&(target, ty.to_string())).cloned()?;
        Some(inline.call(event, args))
    }

    fn perform_default(&self, target: NodeId, ty: &str) -> bool {
        if self.defaults.borrow().contains_key(&(target, ty.to_string())) {
            return self.run_default_action(target, ty);
        }
        match ty {
            "focus" => self.focus(target),
            "blur" => self.blur(target),
            _ => false,
        }
    }

    fn active_element(&self) -> Option<NodeId> {
        self.active.get()
    }
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &self.nodes.borrow().0.len())
            .field("listeners", &self.listener_count())
            .field("active", &self.active.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn tree_shape_and_queries() {
        let doc = MemoryDocument::new();
        let list = doc.element(doc.body(), "ul", &["list"]);
        let a = doc.element(list, "li", &["item", "a"]);
        let b = doc.element(list, "li", &["item"]);
        assert_eq!(doc.parent(doc.body()), Some(doc.document()));
        assert_eq!(doc.parent(doc.document()), Some(doc.window()));
        assert_eq!(doc.find_all(doc.body(), ".item").unwrap(), vec![a, b]);
        assert_eq!(doc.find_one(doc.document(), "ul > .a").unwrap(), Some(a));
        assert!(doc.find_one(doc.body(), "li[").is_err());

        doc.append(doc.body(), b);
        assert_eq!(doc.children(list), vec![a]);
        assert_eq!(doc.children(doc.body()), vec![list, b]);
    }

    #[test]
    fn classification() {
        let doc = MemoryDocument::new();
        let text = doc.create_text();
        let object = doc.create_object();
        assert!(!doc.accepts_bindings(text));
        assert!(!doc.accepts_bindings(doc.create_comment()));
        assert!(doc.accepts_bindings(object));
        assert!(!doc.is_element(object));
        assert!(doc.is_window(doc.window()));
        assert!(doc.is_element(doc.body()));
    }

    #[test]
    fn native_dispatch_bubbles_and_runs_default() {
        let doc = MemoryDocument::new();
        let button = doc.element(doc.body(), "button", &[]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for node in [button, doc.body(), doc.window()] {
            let seen = seen.clone();
            doc.add_listener(
                node,
                "click",
                Rc::new(move |n: NodeId, _: &Rc<NativeEvent<NodeId>>| seen.borrow_mut().push(n)),
            );
        }
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        doc.set_default_action(button, "click", move |_| flag.set(true));

        assert!(doc.dispatch_native(button, &Rc::new(NativeEvent::mouse("click"))));
        assert_eq!(*seen.borrow(), vec![button, doc.body(), doc.window()]);
        assert!(fired.get());
    }

    #[test]
    fn nested_default_action_of_same_slot_is_skipped() {
        let doc = Rc::new(MemoryDocument::new());
        let button = doc.element(doc.body(), "button", &[]);
        let runs = Rc::new(Cell::new(0));
        let count = runs.clone();
        let weak = Rc::downgrade(&doc);
        doc.set_default_action(button, "click", move |node| {
            count.set(count.get() + 1);
            if let Some(doc) = weak.upgrade() {
                doc.dispatch_native(node, &Rc::new(NativeEvent::mouse("click")));
            }
        });

        assert!(doc.dispatch_native(button, &Rc::new(NativeEvent::mouse("click"))));
        assert_eq!(runs.get(), 1);
        assert!(doc.perform_default(button, "click"));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn focus_moves_and_fires() {
        let doc = MemoryDocument::new();
        let a = doc.element(doc.body(), "input", &[]);
        let b = doc.element(doc.body(), "input", &[]);
        let div = doc.element(doc.body(), "div", &[]);
        assert!(doc.focus(a));
        assert_eq!(doc.active_element(), Some(a));
        assert!(doc.focus(b));
        assert_eq!(doc.active_element(), Some(b));
        assert!(!doc.focus(div));
        assert!(doc.blur(b));
        assert_eq!(doc.active_element(), None);
    }
}
