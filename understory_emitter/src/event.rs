// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native events, the normalized [`EventObject`], and custom event properties.
//!
//! ## Native events
//!
//! A [`NativeEvent`] is what the platform delivers: a type, the bubbling and
//! cancelation bits, a bag of platform properties (`clientX`, `key`, ...) and
//! the propagation flags the platform itself honors. It is shared (`Rc`)
//! between the platform and every [`EventObject`] that wraps it, so stopping
//! propagation on the wrapper also stops native bubbling.
//!
//! ## Event objects
//!
//! An [`EventObject`] is built fresh for each dispatch. Its property surface
//! is resolved lazily by [`EventObject::get`]:
//!
//! 1. explicit properties (constructor options or [`EventObject::set`]),
//! 2. the computed `which` property,
//! 3. the [`STANDARD_PROPERTIES`] allow-list, read from the native event,
//! 4. custom properties registered in [`EventProperties`].
//!
//! ```
//! use std::rc::Rc;
//! use understory_emitter::{EventObject, EventProperties, NativeEvent, Value};
//!
//! let props = Rc::new(EventProperties::<u32>::new());
//! props.add_property("answer", |_| Value::from(42));
//!
//! let native = Rc::new(NativeEvent::<u32>::mouse("click").with_prop("clientX", 10));
//! let event = EventObject::from_native(native).with_properties(props);
//! assert_eq!(event.get("clientX"), Some(Value::from(10)));
//! assert_eq!(event.get("answer"), Some(Value::from(42)));
//! assert_eq!(event.get("which"), Some(Value::from(1)));
//! ```

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use bitflags::bitflags;
use serde_json::{Map, Value};

use crate::handler::HandlerEntry;
use crate::hook::{HookRegistry, Verdict};
use crate::namespace::Namespaces;

bitflags! {
    /// Propagation-control state of an event.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventFlags: u8 {
        /// No further nodes receive the event.
        const PROPAGATION_STOPPED = 1;
        /// No further handler of the current dispatch pass runs.
        const IMMEDIATE_PROPAGATION_STOPPED = 1 << 1;
        /// The default action must not run.
        const DEFAULT_PREVENTED = 1 << 2;
    }
}

/// Properties copied by reference from a native event.
pub const STANDARD_PROPERTIES: &[&str] = &[
    "altKey",
    "bubbles",
    "cancelable",
    "changedTouches",
    "ctrlKey",
    "detail",
    "eventPhase",
    "metaKey",
    "pageX",
    "pageY",
    "shiftKey",
    "view",
    "char",
    "code",
    "charCode",
    "key",
    "keyCode",
    "button",
    "buttons",
    "clientX",
    "clientY",
    "offsetX",
    "offsetY",
    "pointerId",
    "pointerType",
    "screenX",
    "screenY",
    "targetTouches",
    "timeStamp",
    "toElement",
    "touches",
];

const MOUSE_DEFAULTS: &[&str] = &[
    "altKey", "button", "buttons", "clientX", "clientY", "ctrlKey", "detail", "metaKey", "offsetX",
    "offsetY", "pageX", "pageY", "screenX", "screenY", "shiftKey",
];

/// An event as delivered by the platform.
pub struct NativeEvent<K> {
    ty: String,
    bubbles: bool,
    cancelable: bool,
    props: RefCell<Map<String, Value>>,
    target: Cell<Option<K>>,
    current_target: Cell<Option<K>>,
    related_target: Option<K>,
    flags: Cell<EventFlags>,
}

impl<K: Copy> NativeEvent<K> {
    /// A non-bubbling, non-cancelable event (`new Event(type)`).
    pub fn new(ty: impl Into<String>) -> Self {
        Self::init(ty, false, false)
    }

    /// An event with explicit bubbling and cancelation bits.
    pub fn init(ty: impl Into<String>, bubbles: bool, cancelable: bool) -> Self {
        Self {
            ty: ty.into(),
            bubbles,
            cancelable,
            props: RefCell::new(Map::new()),
            target: Cell::new(None),
            current_target: Cell::new(None),
            related_target: None,
            flags: Cell::new(EventFlags::empty()),
        }
    }

    /// A bubbling, cancelable mouse event with zeroed coordinates and
    /// modifier keys.
    pub fn mouse(ty: impl Into<String>) -> Self {
        let ev = Self::init(ty, true, true);
        {
            let mut props = ev.props.borrow_mut();
            for name in MOUSE_DEFAULTS {
                let zero = if name.ends_with("Key") {
                    Value::Bool(false)
                } else {
                    Value::from(0)
                };
                props.insert((*name).to_string(), zero);
            }
        }
        ev
    }

    /// Sets a platform property (builder form).
    #[must_use]
    pub fn with_prop(self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets the related target (`mouseover`/`mouseout` counterpart).
    #[must_use]
    pub fn with_related_target(mut self, related: K) -> Self {
        self.related_target = Some(related);
        self
    }

    /// The event type.
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// Whether the platform propagates this event to ancestors.
    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// Whether [`prevent_default`](Self::prevent_default) has any effect.
    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// Reads a platform property.
    ///
    /// `type`, `bubbles`, `cancelable` and `defaultPrevented` are always
    /// available.
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            "type" => Some(Value::String(self.ty.clone())),
            "bubbles" => Some(Value::Bool(self.bubbles)),
            "cancelable" => Some(Value::Bool(self.cancelable)),
            "defaultPrevented" => Some(Value::Bool(self.is_default_prevented())),
            _ => self.props.borrow().get(name).cloned(),
        }
    }

    /// Writes a platform property.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.props.borrow_mut().insert(name.to_string(), value.into());
    }

    /// The node the event was dispatched to.
    pub fn target(&self) -> Option<K> {
        self.target.get()
    }

    /// Records the dispatch target; set by the platform when delivery starts.
    pub fn set_target(&self, target: K) {
        self.target.set(Some(target));
    }

    /// The node whose listeners are currently running.
    pub fn current_target(&self) -> Option<K> {
        self.current_target.get()
    }

    /// Updated by the platform as the event moves along its path.
    pub fn set_current_target(&self, current: Option<K>) {
        self.current_target.set(current);
    }

    /// The secondary node of the event, if any.
    pub fn related_target(&self) -> Option<K> {
        self.related_target
    }

    /// The current flag set.
    pub fn flags(&self) -> EventFlags {
        self.flags.get()
    }

    /// Marks the default action as prevented (cancelable events only).
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.flags.set(self.flags.get() | EventFlags::DEFAULT_PREVENTED);
        }
    }

    /// Stops delivery to further nodes.
    pub fn stop_propagation(&self) {
        self.flags
            .set(self.flags.get() | EventFlags::PROPAGATION_STOPPED);
    }

    /// Stops delivery to further listeners, including those on this node.
    pub fn stop_immediate_propagation(&self) {
        self.flags.set(
            self.flags.get()
                | EventFlags::PROPAGATION_STOPPED
                | EventFlags::IMMEDIATE_PROPAGATION_STOPPED,
        );
    }

    /// Returns `true` if the default action was prevented.
    pub fn is_default_prevented(&self) -> bool {
        self.flags.get().contains(EventFlags::DEFAULT_PREVENTED)
    }

    /// Returns `true` if propagation to further nodes was stopped.
    pub fn is_propagation_stopped(&self) -> bool {
        self.flags.get().contains(EventFlags::PROPAGATION_STOPPED)
    }

    /// Returns `true` if further listeners must not run.
    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.flags
            .get()
            .contains(EventFlags::IMMEDIATE_PROPAGATION_STOPPED)
    }
}

impl<K: fmt::Debug + Copy> fmt::Debug for NativeEvent<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEvent")
            .field("ty", &self.ty)
            .field("bubbles", &self.bubbles)
            .field("cancelable", &self.cancelable)
            .field("target", &self.target.get())
            .field("flags", &self.flags.get())
            .finish_non_exhaustive()
    }
}

/// Computes a custom property from the native event (`None` for synthetic
/// events).
pub type PropertyFactory<K> = Rc<dyn Fn(Option<&NativeEvent<K>>) -> Value>;

/// Process-wide list of custom event properties.
///
/// Registration is additive: properties are never removed, and registering a
/// name again replaces its factory. Every [`EventObject`] that carries the
/// registry resolves the properties lazily, including properties registered
/// after the event was built.
pub struct EventProperties<K> {
    factories: RefCell<Vec<(String, PropertyFactory<K>)>>,
}

impl<K> Default for EventProperties<K> {
    fn default() -> Self {
        Self {
            factories: RefCell::new(Vec::new()),
        }
    }
}

impl<K> EventProperties<K> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`, computed by `factory`.
    pub fn add_property<F>(&self, name: &str, factory: F)
    where
        F: Fn(Option<&NativeEvent<K>>) -> Value + 'static,
    {
        let factory: PropertyFactory<K> = Rc::new(factory);
        let mut factories = self.factories.borrow_mut();
        match factories.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = factory,
            None => factories.push((name.to_string(), factory)),
        }
    }

    /// Returns the factory registered for `name`.
    pub fn get(&self, name: &str) -> Option<PropertyFactory<K>> {
        self.factories
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f.clone())
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.borrow().iter().any(|(n, _)| n == name)
    }

    /// Names of all registered properties, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.factories
            .borrow()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }
}

impl<K> fmt::Debug for EventProperties<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProperties")
            .field("names", &self.names())
            .finish()
    }
}

/// How a synthetic event was triggered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriggerMode {
    /// A full programmatic trigger (propagates, runs defaults).
    Synthetic,
    /// Only the target's own handlers run.
    OnlyHandlers,
}

/// The normalized event handed to handlers.
pub struct EventObject<K> {
    ty: String,
    namespace: Namespaces,
    target: Option<K>,
    current_target: Option<K>,
    delegate_target: Option<K>,
    related_target: Option<K>,
    data: Option<Value>,
    result: Option<Value>,
    original: Option<Rc<NativeEvent<K>>>,
    props: Map<String, Value>,
    flags: EventFlags,
    trigger: Option<TriggerMode>,
    entry: Option<Rc<HandlerEntry<K>>>,
    properties: Option<Rc<EventProperties<K>>>,
    hooks: Option<Rc<HookRegistry<K>>>,
}

impl<K: Copy + 'static> EventObject<K> {
    /// A synthetic event of the given type.
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            namespace: Namespaces::new(),
            target: None,
            current_target: None,
            delegate_target: None,
            related_target: None,
            data: None,
            result: None,
            original: None,
            props: Map::new(),
            flags: EventFlags::empty(),
            trigger: None,
            entry: None,
            properties: None,
            hooks: None,
        }
    }

    /// A synthetic event with options.
    ///
    /// The `namespace` option sets the namespace; every other option becomes
    /// an explicit property.
    pub fn with_options(ty: impl Into<String>, options: Map<String, Value>) -> Self {
        let mut ev = Self::new(ty);
        ev.apply_options(options);
        ev
    }

    /// Wraps a native event.
    pub fn from_native(native: Rc<NativeEvent<K>>) -> Self {
        let mut ev = Self::new(native.ty());
        ev.target = native.target();
        ev.current_target = native.current_target();
        ev.related_target = native.related_target();
        if native.is_default_prevented() {
            ev.flags.insert(EventFlags::DEFAULT_PREVENTED);
        }
        ev.original = Some(native);
        ev
    }

    /// Wraps a native event, overriding properties with `options`.
    pub fn from_native_with(native: Rc<NativeEvent<K>>, options: Map<String, Value>) -> Self {
        let mut ev = Self::from_native(native);
        ev.apply_options(options);
        ev
    }

    /// Builds an event from a `{ "type": ..., ... }` descriptor.
    ///
    /// Returns `None` when the descriptor has no string `type`.
    pub fn from_descriptor(descriptor: &Value) -> Option<Self> {
        let object = descriptor.as_object()?;
        let ty = object.get("type")?.as_str()?.to_string();
        let mut options = object.clone();
        options.remove("type");
        Some(Self::with_options(ty, options))
    }

    /// Attaches the custom-property registry (builder form).
    #[must_use]
    pub fn with_properties(mut self, properties: Rc<EventProperties<K>>) -> Self {
        self.properties = Some(properties);
        self
    }

    fn apply_options(&mut self, options: Map<String, Value>) {
        for (name, value) in options {
            if name == "namespace" {
                if let Some(ns) = value.as_str() {
                    self.namespace = Namespaces::parse(ns);
                }
            } else {
                self.props.insert(name, value);
            }
        }
    }

    /// The event type.
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// Replaces the event type.
    ///
    /// Hooks use this to expose the originally bound type while a translated
    /// type is being dispatched.
    pub fn set_type(&mut self, ty: impl Into<String>) {
        self.ty = ty.into();
    }

    /// The namespace filter carried by the event.
    pub fn namespace(&self) -> &Namespaces {
        &self.namespace
    }

    pub(crate) fn set_namespace(&mut self, namespace: Namespaces) {
        self.namespace = namespace;
    }

    /// The node the event originated from.
    pub fn target(&self) -> Option<K> {
        self.target
    }

    pub(crate) fn set_target(&mut self, target: K) {
        self.target = Some(target);
    }

    /// The node whose handlers are currently running; for delegated handlers
    /// this is the matched descendant.
    pub fn current_target(&self) -> Option<K> {
        self.current_target
    }

    pub(crate) fn set_current_target(&mut self, current: K) {
        self.current_target = Some(current);
    }

    /// The node the running handler was bound on.
    pub fn delegate_target(&self) -> Option<K> {
        self.delegate_target
    }

    pub(crate) fn set_delegate_target(&mut self, node: K) {
        self.delegate_target = Some(node);
    }

    /// The secondary node of the event (`mouseover` counterpart), if any.
    pub fn related_target(&self) -> Option<K> {
        self.related_target
    }

    /// Payload of the binding whose handler is running.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub(crate) fn set_data(&mut self, data: Option<Value>) {
        self.data = data;
    }

    /// The last value returned by a handler, if any.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Overwrites the result.
    pub fn set_result(&mut self, result: Option<Value>) {
        self.result = result;
    }

    /// The wrapped native event, if any.
    pub fn original_event(&self) -> Option<&Rc<NativeEvent<K>>> {
        self.original.as_ref()
    }

    /// How the event was triggered; `None` for native deliveries.
    pub fn is_trigger(&self) -> Option<TriggerMode> {
        self.trigger
    }

    pub(crate) fn set_trigger(&mut self, mode: TriggerMode) {
        self.trigger = Some(mode);
    }

    /// The binding whose handler is currently running.
    pub fn handle_entry(&self) -> Option<&Rc<HandlerEntry<K>>> {
        self.entry.as_ref()
    }

    pub(crate) fn set_handle_entry(&mut self, entry: Option<Rc<HandlerEntry<K>>>) {
        self.entry = entry;
    }

    pub(crate) fn attach_registries(
        &mut self,
        hooks: &Rc<HookRegistry<K>>,
        properties: &Rc<EventProperties<K>>,
    ) {
        self.hooks = Some(hooks.clone());
        self.properties = Some(properties.clone());
    }

    /// Stores an explicit property, shadowing any computed value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.props.insert(name.to_string(), value.into());
    }

    /// Resolves a property by name.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.props.get(name) {
            return Some(v.clone());
        }
        if name == "which" {
            return self.which();
        }
        if STANDARD_PROPERTIES.contains(&name)
            && let Some(native) = &self.original
        {
            return native.get(name);
        }
        let factory = self.properties.as_ref()?.get(name)?;
        Some(factory(self.original.as_deref()))
    }

    /// Returns `true` if `name` is part of this event's property surface,
    /// even when its current value is absent.
    pub fn has(&self, name: &str) -> bool {
        self.props.contains_key(name)
            || (self.original.is_some() && STANDARD_PROPERTIES.contains(&name))
            || self
                .properties
                .as_ref()
                .is_some_and(|p| p.contains(name))
    }

    /// Key code for keyboard events, normalized button number
    /// (1 left, 2 middle, 3 right) for mouse events.
    fn which(&self) -> Option<Value> {
        let native = self.original.as_ref()?;
        if let Some(which) = native.get("which") {
            return Some(which);
        }
        let ty = native.ty();
        if ty.starts_with("key") {
            return native.get("charCode").or_else(|| native.get("keyCode"));
        }
        let mouse_like = ["mouse", "pointer", "contextmenu", "drag", "drop"]
            .iter()
            .any(|p| ty.starts_with(p))
            || ty.contains("click");
        if mouse_like && let Some(button) = native.get("button").and_then(|b| b.as_u64()) {
            // `button` is 0 left, 1 middle, 2 right.
            let which = match button {
                0 => 1,
                1 => 2,
                2 => 3,
                other => other + 1,
            };
            return Some(Value::from(which));
        }
        None
    }

    /// Current flag set.
    pub fn flags(&self) -> EventFlags {
        self.flags
    }

    /// Prevents the default action, unless a `prevent_default` hook for this
    /// type vetoes it.
    pub fn prevent_default(&mut self) {
        let hook = self.hooks.as_ref().and_then(|h| h.get(&self.ty));
        if let Some(veto) = hook.as_ref().and_then(|h| h.prevent_default.clone())
            && veto(self) == Verdict::Veto
        {
            tracing::trace!(event_type = %self.ty, "prevent_default vetoed by hook");
            return;
        }
        self.flags.insert(EventFlags::DEFAULT_PREVENTED);
        if let Some(native) = &self.original {
            native.prevent_default();
        }
    }

    /// Stops propagation to further nodes once the current node's handlers
    /// finish.
    pub fn stop_propagation(&mut self) {
        self.flags.insert(EventFlags::PROPAGATION_STOPPED);
        if let Some(native) = &self.original {
            native.stop_propagation();
        }
    }

    /// Stops every further handler of this dispatch pass.
    pub fn stop_immediate_propagation(&mut self) {
        self.flags.insert(EventFlags::IMMEDIATE_PROPAGATION_STOPPED);
        if let Some(native) = &self.original {
            native.stop_immediate_propagation();
        }
        self.stop_propagation();
    }

    /// Returns `true` if the default action was prevented.
    pub fn is_default_prevented(&self) -> bool {
        self.flags.contains(EventFlags::DEFAULT_PREVENTED)
    }

    /// Returns `true` if propagation was stopped.
    pub fn is_propagation_stopped(&self) -> bool {
        self.flags.contains(EventFlags::PROPAGATION_STOPPED)
    }

    /// Returns `true` if immediate propagation was stopped.
    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.flags
            .contains(EventFlags::IMMEDIATE_PROPAGATION_STOPPED)
    }
}

impl<K: fmt::Debug> fmt::Debug for EventObject<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventObject")
            .field("ty", &self.ty)
            .field("namespace", &self.namespace)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("data", &self.data)
            .field("result", &self.result)
            .field("flags", &self.flags)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}
