// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The binding registry: `on`, `off`, `once` and `trigger`.
//!
//! An [`Emitter`] keeps, per target, an ordered list of [`HandlerEntry`]
//! values for every bound type, and coordinates the platform listener
//! lifecycle: the first binding of a type attaches one listener (unless a
//! hook's `setup` wires the type itself), the last removal detaches it.
//!
//! Every target shares one listener callback across its types. The callback
//! holds a weak reference to the emitter, so dropping the emitter silences
//! listeners the host still holds.

use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use serde_json::Value;

use crate::builtin;
use crate::error::EventError;
use crate::event::{EventObject, EventProperties, NativeEvent, TriggerMode};
use crate::handler::{EntryId, HandlerEntry, HandlerSpec};
use crate::hook::{Attach, HookRegistry, Verdict};
use crate::host::{Host, Listener, NodeKey, ancestors};
use crate::namespace::{Namespaces, TypeToken, parse_types};

/// A binding request in canonical form.
#[derive(Clone, Debug)]
pub struct Binding<K> {
    /// Space-separated type tokens, each with optional namespaces.
    pub types: String,
    /// Delegation selector; `None` binds directly.
    pub selector: Option<String>,
    /// Payload exposed as `event.data`.
    pub data: Option<Value>,
    /// The handler, handler object, `false` or nothing.
    pub handler: HandlerSpec<K>,
    /// Remove the binding before its first run.
    pub once: bool,
}

impl<K> Binding<K> {
    /// A direct binding of `handler` to `types`.
    pub fn new(types: impl Into<String>, handler: impl Into<HandlerSpec<K>>) -> Self {
        Self {
            types: types.into(),
            selector: None,
            data: None,
            handler: handler.into(),
            once: false,
        }
    }

    /// Delegates the binding to descendants matching `selector`.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Marks the binding as one-shot.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// An unbinding request in canonical form.
///
/// Every field narrows the set of removed bindings; the default request
/// removes everything.
#[derive(Clone, Debug)]
pub struct Unbind<K> {
    /// Type tokens; `None` for every type. Namespace-only tokens (`".ns"`)
    /// apply across all types.
    pub types: Option<String>,
    /// Only bindings with this selector; `"**"` matches every delegated
    /// binding.
    pub selector: Option<String>,
    /// Only bindings of this handler.
    pub handler: Option<HandlerSpec<K>>,
}

impl<K> Default for Unbind<K> {
    fn default() -> Self {
        Self {
            types: None,
            selector: None,
            handler: None,
        }
    }
}

impl<K> Unbind<K> {
    /// Removes every binding.
    pub fn all() -> Self {
        Self::default()
    }

    /// Removes bindings of `types`.
    pub fn types(types: impl Into<String>) -> Self {
        Self {
            types: Some(types.into()),
            ..Self::default()
        }
    }

    /// Narrows to bindings delegated with `selector`.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Narrows to bindings of `handler`.
    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<HandlerSpec<K>>) -> Self {
        self.handler = Some(handler.into());
        self
    }
}

/// The event argument of a trigger.
#[derive(Debug)]
pub enum TriggerEvent<K> {
    /// A type token, possibly namespaced (`"click.menu"`).
    Type(String),
    /// An existing event object, re-triggered with its namespace.
    Event(EventObject<K>),
    /// A `{ "type": ..., ... }` descriptor.
    Descriptor(Value),
}

impl<K: NodeKey> TriggerEvent<K> {
    fn into_event(self) -> Option<EventObject<K>> {
        let mut event = match self {
            Self::Type(ty) => EventObject::new(ty),
            Self::Event(event) => event,
            Self::Descriptor(descriptor) => EventObject::from_descriptor(&descriptor)?,
        };
        if event.ty().contains('.') {
            let token = TypeToken::parse(event.ty());
            let namespace = Namespaces::from_labels(event.namespace().iter().chain(token.namespaces.iter()));
            event.set_type(token.ty);
            event.set_namespace(namespace);
        }
        (!event.ty().is_empty()).then_some(event)
    }
}

impl<K> From<&str> for TriggerEvent<K> {
    fn from(ty: &str) -> Self {
        Self::Type(ty.to_string())
    }
}

impl<K> From<String> for TriggerEvent<K> {
    fn from(ty: String) -> Self {
        Self::Type(ty)
    }
}

impl<K> From<EventObject<K>> for TriggerEvent<K> {
    fn from(event: EventObject<K>) -> Self {
        Self::Event(event)
    }
}

impl<K> From<Value> for TriggerEvent<K> {
    fn from(descriptor: Value) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// Extra arguments handed to handlers after the event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtraArgs(pub Vec<Value>);

impl From<()> for ExtraArgs {
    fn from((): ()) -> Self {
        Self(Vec::new())
    }
}

impl From<Vec<Value>> for ExtraArgs {
    fn from(args: Vec<Value>) -> Self {
        Self(args)
    }
}

impl From<Value> for ExtraArgs {
    /// Arrays are spread, `null` means no arguments, anything else is a
    /// single argument.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(args) => Self(args),
            Value::Null => Self(Vec::new()),
            other => Self(alloc::vec![other]),
        }
    }
}

/// Construction options for an [`Emitter`].
#[derive(Clone, Debug)]
pub struct EmitterConfig<K> {
    /// Install the built-in hooks (`load`, `beforeunload`, focus and
    /// enter/leave emulation) for types that have no hook yet.
    pub builtin_hooks: bool,
    /// Share an existing hook registry instead of creating one.
    pub hooks: Option<Rc<HookRegistry<K>>>,
    /// Share an existing custom-property registry instead of creating one.
    pub properties: Option<Rc<EventProperties<K>>>,
}

impl<K> Default for EmitterConfig<K> {
    fn default() -> Self {
        Self {
            builtin_hooks: true,
            hooks: None,
            properties: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TypeSlot<K> {
    pub(crate) delegated: Vec<Rc<HandlerEntry<K>>>,
    pub(crate) direct: Vec<Rc<HandlerEntry<K>>>,
    attached: Attach,
}

impl<K> TypeSlot<K> {
    fn new() -> Self {
        Self {
            delegated: Vec::new(),
            direct: Vec::new(),
            attached: Attach::Handled,
        }
    }

    fn is_empty(&self) -> bool {
        self.delegated.is_empty() && self.direct.is_empty()
    }
}

pub(crate) struct TargetBindings<K> {
    pub(crate) types: HashMap<String, TypeSlot<K>>,
    listener: Option<Listener<K>>,
}

impl<K> TargetBindings<K> {
    fn new() -> Self {
        Self {
            types: HashMap::new(),
            listener: None,
        }
    }
}

/// Per-target binding store and trigger engine.
pub struct Emitter<K> {
    pub(crate) host: Rc<dyn Host<K>>,
    pub(crate) hooks: Rc<HookRegistry<K>>,
    pub(crate) properties: Rc<EventProperties<K>>,
    pub(crate) targets: RefCell<HashMap<K, TargetBindings<K>>>,
    next_entry: Cell<u64>,
    triggered: RefCell<Option<String>>,
    this: Weak<Self>,
}

impl<K: NodeKey> Emitter<K> {
    /// Creates an emitter over `host` with the default configuration.
    pub fn new(host: Rc<dyn Host<K>>) -> Rc<Self> {
        Self::with_config(host, EmitterConfig::default())
    }

    /// Creates an emitter over `host`.
    pub fn with_config(host: Rc<dyn Host<K>>, config: EmitterConfig<K>) -> Rc<Self> {
        let hooks = config.hooks.unwrap_or_default();
        let properties = config.properties.unwrap_or_default();
        if config.builtin_hooks {
            builtin::install(&hooks, &host);
        }
        Rc::new_cyclic(|this| Self {
            host,
            hooks,
            properties,
            targets: RefCell::new(HashMap::new()),
            next_entry: Cell::new(0),
            triggered: RefCell::new(None),
            this: this.clone(),
        })
    }

    /// The tree and platform collaborator.
    pub fn host(&self) -> &Rc<dyn Host<K>> {
        &self.host
    }

    /// The hook registry consulted by this emitter.
    pub fn hooks(&self) -> &Rc<HookRegistry<K>> {
        &self.hooks
    }

    /// The custom-property registry attached to every event.
    pub fn properties(&self) -> &Rc<EventProperties<K>> {
        &self.properties
    }

    /// Shorthand for [`EventProperties::add_property`].
    pub fn add_property<F>(&self, name: &str, factory: F)
    where
        F: Fn(Option<&NativeEvent<K>>) -> Value + 'static,
    {
        self.properties.add_property(name, factory);
    }

    /// Returns `true` if `target` has any binding.
    pub fn has_bindings(&self, target: K) -> bool {
        self.targets.borrow().contains_key(&target)
    }

    /// The types bound on `target`, sorted.
    pub fn bound_types(&self, target: K) -> Vec<String> {
        let mut types: Vec<String> = self
            .targets
            .borrow()
            .get(&target)
            .map(|b| b.types.keys().cloned().collect())
            .unwrap_or_default();
        types.sort();
        types
    }

    /// The bindings of `ty` on `target`, delegated first, each group in
    /// insertion order.
    pub fn bindings(&self, target: K, ty: &str) -> Vec<Rc<HandlerEntry<K>>> {
        self.targets
            .borrow()
            .get(&target)
            .and_then(|b| b.types.get(ty))
            .map(|slot| slot.delegated.iter().chain(&slot.direct).cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn has_type(&self, target: K, ty: &str) -> bool {
        self.targets
            .borrow()
            .get(&target)
            .is_some_and(|b| b.types.contains_key(ty))
    }

    /// Registers a binding on `target`.
    ///
    /// Targets that cannot carry bindings are ignored. A selector requires an
    /// element target and must parse; matching zero elements is fine.
    pub fn on(&self, target: K, binding: Binding<K>) -> Result<(), EventError> {
        if !self.host.accepts_bindings(target) {
            tracing::trace!(node = ?target, "target cannot carry bindings; ignored");
            return Ok(());
        }
        if let Some(selector) = &binding.selector {
            if !self.host.is_element(target) {
                return Err(EventError::DelegationUnsupported);
            }
            self.host.matches(target, selector)?;
        }

        let Binding {
            types,
            selector,
            data,
            handler,
            once,
        } = binding;
        let (callback, object_data) = handler.into_parts();
        let data = data.or(object_data);
        let delegated = selector.is_some();

        for token in parse_types(&types) {
            if token.is_namespace_only() {
                continue;
            }
            let ty = self.hooks.bound_type(&token.ty, delegated);
            let entry = Rc::new(HandlerEntry {
                id: self.next_id(),
                ty: ty.clone(),
                orig_type: token.ty,
                namespaces: token.namespaces,
                selector: selector.clone(),
                data: data.clone(),
                callback: callback.clone(),
                once,
            });
            self.add_entry(target, entry);
        }
        Ok(())
    }

    /// Registers a binding that removes itself before its first run.
    pub fn once(&self, target: K, binding: Binding<K>) -> Result<(), EventError> {
        self.on(target, binding.once())
    }

    fn next_id(&self) -> EntryId {
        let id = self.next_entry.get();
        self.next_entry.set(id + 1);
        EntryId(id)
    }

    fn add_entry(&self, target: K, entry: Rc<HandlerEntry<K>>) {
        let ty = entry.ty.clone();
        let hook = self.hooks.get(&ty);

        let first = {
            let mut targets = self.targets.borrow_mut();
            let bindings = targets.entry(target).or_insert_with(TargetBindings::new);
            if bindings.types.contains_key(&ty) {
                false
            } else {
                bindings.types.insert(ty.clone(), TypeSlot::new());
                true
            }
        };

        if first {
            let attach = match hook.as_ref().and_then(|h| h.setup.clone()) {
                Some(setup) => setup(target, &entry),
                None => Attach::Platform,
            };
            if attach == Attach::Platform {
                let listener = self.listener_for(target);
                self.host.add_listener(target, &ty, listener);
                tracing::debug!(node = ?target, event_type = %ty, "platform listener attached");
            } else {
                tracing::debug!(node = ?target, event_type = %ty, "setup hook wired type");
            }
            if let Some(slot) = self.targets.borrow_mut().get_mut(&target).and_then(|b| b.types.get_mut(&ty)) {
                slot.attached = attach;
            }
        }

        if let Some(add) = hook.as_ref().and_then(|h| h.add.clone()) {
            add(target, &entry);
        }

        tracing::trace!(
            node = ?target,
            event_type = %ty,
            namespaces = %entry.namespaces.joined(),
            delegated = entry.selector.is_some(),
            "binding added"
        );
        let mut targets = self.targets.borrow_mut();
        let slot = targets
            .entry(target)
            .or_insert_with(TargetBindings::new)
            .types
            .entry(ty)
            .or_insert_with(TypeSlot::new);
        if entry.selector.is_some() {
            slot.delegated.push(entry);
        } else {
            slot.direct.push(entry);
        }
    }

    fn listener_for(&self, target: K) -> Listener<K> {
        let mut targets = self.targets.borrow_mut();
        let bindings = targets.entry(target).or_insert_with(TargetBindings::new);
        bindings
            .listener
            .get_or_insert_with(|| {
                let emitter = self.this.clone();
                Rc::new(move |node: K, native: &Rc<NativeEvent<K>>| {
                    if let Some(emitter) = emitter.upgrade() {
                        emitter.handle_native(node, native);
                    }
                })
            })
            .clone()
    }

    /// Removes bindings from `target`. Never fails; unmatched requests do
    /// nothing.
    pub fn off(&self, target: K, unbind: Unbind<K>) {
        if !self.has_bindings(target) {
            return;
        }
        let Unbind {
            types,
            selector,
            handler,
        } = unbind;
        let mut tokens: Vec<TypeToken> = types.as_deref().map(|t| parse_types(t).collect()).unwrap_or_default();
        if tokens.is_empty() {
            tokens.push(TypeToken::default());
        }

        for token in tokens {
            let request = Removal {
                orig_type: None,
                namespaces: &token.namespaces,
                selector: selector.as_deref(),
                handler: handler.as_ref(),
            };
            if token.is_namespace_only() {
                for ty in self.bound_types(target) {
                    self.remove_where(target, &ty, |e| request.matches(e));
                }
            } else {
                let ty = self.hooks.bound_type(&token.ty, selector.is_some());
                let request = Removal {
                    orig_type: Some(&token.ty),
                    ..request
                };
                self.remove_where(target, &ty, |e| request.matches(e));
            }
        }
    }

    /// Removes every binding from `target`.
    pub fn off_all(&self, target: K) {
        self.off(target, Unbind::all());
    }

    /// Removes exactly `entry` from `target`; returns `false` if it was
    /// already gone.
    pub(crate) fn remove_entry(&self, target: K, entry: &HandlerEntry<K>) -> bool {
        let id = entry.id;
        self.remove_where(target, &entry.ty, |e| e.id == id)
    }

    fn remove_where(&self, target: K, ty: &str, pred: impl Fn(&HandlerEntry<K>) -> bool) -> bool {
        let (removed, emptied) = {
            let mut targets = self.targets.borrow_mut();
            let Some(bindings) = targets.get_mut(&target) else {
                return false;
            };
            let Some(slot) = bindings.types.get_mut(ty) else {
                return false;
            };
            let mut removed = Vec::new();
            for list in [&mut slot.delegated, &mut slot.direct] {
                list.retain(|e| {
                    let hit = pred(e);
                    if hit {
                        removed.push(e.clone());
                    }
                    !hit
                });
            }
            let emptied = if !removed.is_empty() && slot.is_empty() {
                let attached = slot.attached;
                bindings.types.remove(ty);
                Some(attached)
            } else {
                None
            };
            (removed, emptied)
        };
        if removed.is_empty() {
            return false;
        }

        let hook = self.hooks.get(ty);
        if let Some(remove) = hook.as_ref().and_then(|h| h.remove.clone()) {
            for entry in &removed {
                remove(target, entry);
            }
        }
        tracing::trace!(node = ?target, event_type = %ty, count = removed.len(), "bindings removed");

        if let Some(attached) = emptied {
            let verdict = match hook.as_ref().and_then(|h| h.teardown.clone()) {
                Some(teardown) => teardown(target),
                None => Attach::Platform,
            };
            if attached == Attach::Platform && verdict == Attach::Platform {
                self.host.remove_listener(target, ty);
                tracing::debug!(node = ?target, event_type = %ty, "platform listener detached");
            }
            let mut targets = self.targets.borrow_mut();
            if targets.get(&target).is_some_and(|b| b.types.is_empty()) {
                targets.remove(&target);
            }
        }
        true
    }

    /// Triggers `event` on `target` and returns the event's final result.
    ///
    /// The event runs on the target, then on each ancestor up to the window,
    /// then the target's inline handler and the native default action run
    /// unless prevented. With `only_handlers`, only the target's own bindings
    /// run.
    ///
    /// A veto from the type's `trigger` or `pre_dispatch` hook aborts the
    /// whole trigger: the rest of the path, the inline handler and the
    /// default action are skipped, and `None` is returned.
    pub fn trigger(
        &self,
        target: K,
        event: impl Into<TriggerEvent<K>>,
        args: impl Into<ExtraArgs>,
        only_handlers: bool,
    ) -> Option<Value> {
        if !self.host.accepts_bindings(target) {
            return None;
        }
        let mut event = event.into().into_event()?;
        let ExtraArgs(args) = args.into();

        event.set_result(None);
        if event.target().is_none() {
            event.set_target(target);
        }
        event.set_trigger(if only_handlers {
            TriggerMode::OnlyHandlers
        } else {
            TriggerMode::Synthetic
        });
        event.attach_registries(&self.hooks, &self.properties);

        let ty = event.ty().to_string();
        let hook = self.hooks.get(&ty);
        if !only_handlers
            && let Some(gate) = hook.as_ref().and_then(|h| h.trigger.clone())
            && gate(target, &mut event, args.as_slice()) == Verdict::Veto
        {
            tracing::debug!(node = ?target, event_type = %ty, "trigger vetoed by hook");
            return None;
        }
        tracing::trace!(node = ?target, event_type = %ty, only_handlers, "trigger");

        let bind_type = hook
            .as_ref()
            .and_then(|h| h.bind_type.clone())
            .unwrap_or_else(|| ty.clone());
        let mut path: Vec<(K, String)> = alloc::vec![(target, bind_type)];
        let no_bubble = hook.as_ref().is_some_and(|h| h.no_bubble);
        if !only_handlers && !no_bubble && !self.host.is_window(target) {
            let bubble_type = hook
                .as_ref()
                .and_then(|h| h.delegate_type.clone())
                .unwrap_or_else(|| ty.clone());
            path.extend(ancestors(&*self.host, target).map(|node| (node, bubble_type.clone())));
        }

        for (node, node_type) in path {
            if event.is_propagation_stopped() {
                break;
            }
            if self.has_type(node, &node_type) {
                event.set_type(node_type);
                if self.dispatch(node, &mut event, &args) == Verdict::Veto {
                    tracing::debug!(node = ?node, event_type = %ty, "trigger aborted by pre_dispatch");
                    return None;
                }
            }
        }
        event.set_type(ty.clone());

        if !only_handlers && !event.is_default_prevented() && !event.is_propagation_stopped() {
            event.set_current_target(target);
            if let Some(output) = self.host.call_inline(target, &ty, &mut event, &args) {
                crate::dispatch::apply_output(&mut event, output);
            }
            if !event.is_default_prevented() {
                self.run_default(target, &ty);
            }
        }
        event.result().cloned()
    }

    fn run_default(&self, target: K, ty: &str) {
        let previous = self.triggered.replace(Some(ty.to_string()));
        let performed = self.host.perform_default(target, ty);
        self.triggered.replace(previous);
        if performed {
            tracing::trace!(node = ?target, event_type = %ty, "native default performed");
        }
    }

    /// The platform listener entry point: dispatches a native event reaching
    /// `current`.
    ///
    /// Deliveries caused by a default action this emitter is performing are
    /// ignored.
    pub fn handle_native(&self, current: K, native: &Rc<NativeEvent<K>>) {
        if self.triggered.borrow().as_deref() == Some(native.ty()) {
            return;
        }
        let mut event = EventObject::from_native(native.clone());
        event.attach_registries(&self.hooks, &self.properties);
        if event.target().is_none() {
            event.set_target(current);
        }
        self.dispatch(current, &mut event, &[]);
    }
}

impl<K: fmt::Debug> fmt::Debug for Emitter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("hooks", &self.hooks)
            .field("targets", &self.targets.borrow().len())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy)]
struct Removal<'a, K> {
    orig_type: Option<&'a str>,
    namespaces: &'a Namespaces,
    selector: Option<&'a str>,
    handler: Option<&'a HandlerSpec<K>>,
}

impl<K: NodeKey> Removal<'_, K> {
    fn matches(&self, entry: &HandlerEntry<K>) -> bool {
        self.orig_type.is_none_or(|t| t == entry.orig_type)
            && self.handler.is_none_or(|h| entry.callback.matches(h))
            && entry.namespaces.satisfies(self.namespaces)
            && match self.selector {
                None => true,
                Some("**") => entry.selector.is_some(),
                Some(s) => entry.selector.as_deref() == Some(s),
            }
    }
}
