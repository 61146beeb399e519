// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-type hooks.
//!
//! A [`Hook`] overrides parts of the binding and dispatch lifecycle for one
//! event type. Every callback is optional; an absent callback means "default
//! behavior".
//!
//! | Callback          | When                                              |
//! |-------------------|---------------------------------------------------|
//! | `add`/`remove`    | every binding added to / removed from a target    |
//! | `setup`/`teardown`| first binding added / last binding removed        |
//! | `trigger`         | before a programmatic trigger (may veto)          |
//! | `pre_dispatch`    | before a node's handlers run (may veto)           |
//! | `handle`          | instead of calling each handler                   |
//! | `post_dispatch`   | after a node's handlers ran                       |
//! | `prevent_default` | when a handler prevents the default (may veto)    |
//!
//! Registration replaces any previous hook of the type wholesale; partial
//! hooks are never merged.
//!
//! ```
//! use understory_emitter::hook::{Hook, HookRegistry, Verdict};
//!
//! let hooks = HookRegistry::<u32>::new();
//! hooks.register("dblclick", Hook::new().on_pre_dispatch(|_, _| Verdict::Veto));
//! assert!(hooks.get("dblclick").is_some());
//! hooks.unregister("dblclick");
//! assert!(hooks.get("dblclick").is_none());
//! ```

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;
use serde_json::Value;

use crate::event::EventObject;
use crate::handler::{HandlerEntry, HandlerOutput};

/// Result of a gate callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Carry on with the default behavior.
    Proceed,
    /// Abort the guarded step.
    Veto,
}

/// Result of a `setup`/`teardown` callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Attach {
    /// The hook did not wire the type; the platform listener is
    /// attached/detached as usual.
    Platform,
    /// The hook wired the type itself; the platform is left alone.
    Handled,
}

/// Per-binding bookkeeping callback.
pub type EntryHook<K> = Rc<dyn Fn(K, &HandlerEntry<K>)>;
/// First-binding callback.
pub type SetupHook<K> = Rc<dyn Fn(K, &HandlerEntry<K>) -> Attach>;
/// Last-binding callback.
pub type TeardownHook<K> = Rc<dyn Fn(K) -> Attach>;
/// Replacement for invoking a binding's handler.
pub type HandleHook<K> = Rc<dyn Fn(&mut EventObject<K>, &HandlerEntry<K>, &[Value]) -> HandlerOutput>;
/// Gate run before a programmatic trigger.
pub type TriggerHook<K> = Rc<dyn Fn(K, &mut EventObject<K>, &[Value]) -> Verdict>;
/// Gate run before a node's handlers.
pub type PreDispatchHook<K> = Rc<dyn Fn(K, &mut EventObject<K>) -> Verdict>;
/// Callback run after a node's handlers.
pub type PostDispatchHook<K> = Rc<dyn Fn(K, &mut EventObject<K>)>;
/// Veto for default prevention.
pub type PreventDefaultHook<K> = Rc<dyn Fn(&EventObject<K>) -> Verdict>;

/// Lifecycle overrides for one event type.
pub struct Hook<K> {
    /// Called for every binding added.
    pub add: Option<EntryHook<K>>,
    /// Called for every binding removed.
    pub remove: Option<EntryHook<K>>,
    /// Called when the first binding of the type is added to a target.
    pub setup: Option<SetupHook<K>>,
    /// Called when the last binding of the type is removed from a target.
    pub teardown: Option<TeardownHook<K>>,
    /// Replaces "call the handler and apply its return value".
    pub handle: Option<HandleHook<K>>,
    /// Gate before a programmatic trigger.
    pub trigger: Option<TriggerHook<K>>,
    /// Gate before a node's handlers run.
    pub pre_dispatch: Option<PreDispatchHook<K>>,
    /// Runs after a node's handlers, whatever the stop flags say.
    pub post_dispatch: Option<PostDispatchHook<K>>,
    /// Veto for [`EventObject::prevent_default`].
    pub prevent_default: Option<PreventDefaultHook<K>>,
    /// Triggered events of this type do not walk ancestors.
    pub no_bubble: bool,
    /// Type bound instead of this one for direct bindings.
    pub bind_type: Option<String>,
    /// Type bound instead of this one for delegated bindings.
    pub delegate_type: Option<String>,
}

impl<K> Default for Hook<K> {
    fn default() -> Self {
        Self {
            add: None,
            remove: None,
            setup: None,
            teardown: None,
            handle: None,
            trigger: None,
            pre_dispatch: None,
            post_dispatch: None,
            prevent_default: None,
            no_bubble: false,
            bind_type: None,
            delegate_type: None,
        }
    }
}

impl<K> Hook<K> {
    /// A hook that overrides nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `add` callback.
    #[must_use]
    pub fn on_add(mut self, f: impl Fn(K, &HandlerEntry<K>) + 'static) -> Self {
        self.add = Some(Rc::new(f));
        self
    }

    /// Sets the `remove` callback.
    #[must_use]
    pub fn on_remove(mut self, f: impl Fn(K, &HandlerEntry<K>) + 'static) -> Self {
        self.remove = Some(Rc::new(f));
        self
    }

    /// Sets the `setup` callback.
    #[must_use]
    pub fn on_setup(mut self, f: impl Fn(K, &HandlerEntry<K>) -> Attach + 'static) -> Self {
        self.setup = Some(Rc::new(f));
        self
    }

    /// Sets the `teardown` callback.
    #[must_use]
    pub fn on_teardown(mut self, f: impl Fn(K) -> Attach + 'static) -> Self {
        self.teardown = Some(Rc::new(f));
        self
    }

    /// Sets the `handle` callback.
    #[must_use]
    pub fn on_handle(
        mut self,
        f: impl Fn(&mut EventObject<K>, &HandlerEntry<K>, &[Value]) -> HandlerOutput + 'static,
    ) -> Self {
        self.handle = Some(Rc::new(f));
        self
    }

    /// Sets the `trigger` gate.
    #[must_use]
    pub fn on_trigger(
        mut self,
        f: impl Fn(K, &mut EventObject<K>, &[Value]) -> Verdict + 'static,
    ) -> Self {
        self.trigger = Some(Rc::new(f));
        self
    }

    /// Sets the `pre_dispatch` gate.
    #[must_use]
    pub fn on_pre_dispatch(
        mut self,
        f: impl Fn(K, &mut EventObject<K>) -> Verdict + 'static,
    ) -> Self {
        self.pre_dispatch = Some(Rc::new(f));
        self
    }

    /// Sets the `post_dispatch` callback.
    #[must_use]
    pub fn on_post_dispatch(mut self, f: impl Fn(K, &mut EventObject<K>) + 'static) -> Self {
        self.post_dispatch = Some(Rc::new(f));
        self
    }

    /// Sets the `prevent_default` veto.
    #[must_use]
    pub fn on_prevent_default(mut self, f: impl Fn(&EventObject<K>) -> Verdict + 'static) -> Self {
        self.prevent_default = Some(Rc::new(f));
        self
    }

    /// Marks the type as non-bubbling for programmatic triggers.
    #[must_use]
    pub fn no_bubble(mut self) -> Self {
        self.no_bubble = true;
        self
    }

    /// Binds direct handlers under another type.
    #[must_use]
    pub fn bind_as(mut self, ty: &str) -> Self {
        self.bind_type = Some(ty.to_string());
        self
    }

    /// Binds delegated handlers under another type.
    #[must_use]
    pub fn delegate_as(mut self, ty: &str) -> Self {
        self.delegate_type = Some(ty.to_string());
        self
    }
}

impl<K> fmt::Debug for Hook<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("add", &self.add.is_some())
            .field("remove", &self.remove.is_some())
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .field("handle", &self.handle.is_some())
            .field("trigger", &self.trigger.is_some())
            .field("pre_dispatch", &self.pre_dispatch.is_some())
            .field("post_dispatch", &self.post_dispatch.is_some())
            .field("prevent_default", &self.prevent_default.is_some())
            .field("no_bubble", &self.no_bubble)
            .field("bind_type", &self.bind_type)
            .field("delegate_type", &self.delegate_type)
            .finish()
    }
}

/// Mapping from event type to its [`Hook`].
///
/// The registry is shared (`Rc`) by every emitter and event object that uses
/// it. Lookups hand out `Rc<Hook>` clones, so hooks may register or
/// unregister hooks while they run.
pub struct HookRegistry<K> {
    hooks: RefCell<HashMap<String, Rc<Hook<K>>>>,
}

impl<K> Default for HookRegistry<K> {
    fn default() -> Self {
        Self {
            hooks: RefCell::new(HashMap::new()),
        }
    }
}

impl<K> HookRegistry<K> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` for `ty`, replacing any previous hook.
    pub fn register(&self, ty: &str, hook: Hook<K>) {
        tracing::debug!(event_type = ty, "hook registered");
        self.hooks.borrow_mut().insert(ty.to_string(), Rc::new(hook));
    }

    /// Removes the hook for `ty`, returning it.
    pub fn unregister(&self, ty: &str) -> Option<Rc<Hook<K>>> {
        let removed = self.hooks.borrow_mut().remove(ty);
        if removed.is_some() {
            tracing::debug!(event_type = ty, "hook unregistered");
        }
        removed
    }

    /// Returns the hook for `ty`.
    pub fn get(&self, ty: &str) -> Option<Rc<Hook<K>>> {
        self.hooks.borrow().get(ty).cloned()
    }

    /// Removes every hook.
    pub fn clear(&self) {
        self.hooks.borrow_mut().clear();
    }

    /// Registered types, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.hooks.borrow().keys().cloned().collect();
        types.sort();
        types
    }

    /// The type a binding of `ty` is stored under.
    pub(crate) fn bound_type(&self, ty: &str, delegated: bool) -> String {
        self.get(ty)
            .and_then(|hook| {
                if delegated {
                    hook.delegate_type.clone()
                } else {
                    hook.bind_type.clone()
                }
            })
            .unwrap_or_else(|| ty.to_string())
    }
}

impl<K> fmt::Debug for HookRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("types", &self.types())
            .finish()
    }
}
