// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handlers and the bindings that hold them.

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;

use serde_json::Value;

use crate::event::EventObject;
use crate::namespace::Namespaces;

/// What a handler returned.
///
/// `None` stands for "no value". A return of exactly `false` prevents the
/// default action and stops propagation; any other value becomes the event's
/// `result`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandlerOutput(pub Option<Value>);

impl HandlerOutput {
    /// No value.
    pub const NONE: Self = Self(None);

    /// Returns `true` for an explicit `false`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        matches!(self.0, Some(Value::Bool(false)))
    }
}

impl From<()> for HandlerOutput {
    fn from((): ()) -> Self {
        Self(None)
    }
}

impl From<bool> for HandlerOutput {
    fn from(value: bool) -> Self {
        Self(Some(Value::Bool(value)))
    }
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        Self(Some(value))
    }
}

impl From<Option<Value>> for HandlerOutput {
    fn from(value: Option<Value>) -> Self {
        Self(value)
    }
}

type HandlerFn<K> = dyn Fn(&mut EventObject<K>, &[Value]) -> HandlerOutput;

/// A reference-counted event handler.
///
/// Clones share identity: unbinding with any clone removes every binding
/// made with the same handler.
pub struct Handler<K>(Rc<HandlerFn<K>>);

impl<K> Clone for Handler<K> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<K: 'static> Handler<K> {
    /// Wraps a closure.
    ///
    /// The closure receives the event and the extra trigger arguments and may
    /// return `()`, a `bool`, a [`Value`] or an `Option<Value>`.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&mut EventObject<K>, &[Value]) -> R + 'static,
        R: Into<HandlerOutput>,
    {
        Self(Rc::new(
            move |event: &mut EventObject<K>, args: &[Value]| -> HandlerOutput {
                f(event, args).into()
            },
        ))
    }

    /// Invokes the handler.
    pub fn call(&self, event: &mut EventObject<K>, args: &[Value]) -> HandlerOutput {
        (self.0)(event, args)
    }

    /// Stable identity of this handler.
    #[must_use]
    pub fn guid(&self) -> HandlerGuid {
        HandlerGuid(Rc::as_ptr(&self.0).cast::<()>() as usize)
    }
}

impl<K> PartialEq for Handler<K> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<K> fmt::Debug for Handler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Identity of a [`Handler`], valid while any clone of it is alive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerGuid(usize);

/// The handler argument accepted by binding calls.
#[derive(Clone, Debug)]
pub enum HandlerSpec<K> {
    /// A plain handler.
    Fn(Handler<K>),
    /// A handler object carrying its own payload.
    Object {
        /// The handler.
        handler: Handler<K>,
        /// Payload used when the binding call gives none.
        data: Option<Value>,
    },
    /// The `false` placeholder: bound as a no-op.
    False,
    /// No handler: bound as a no-op.
    Missing,
}

impl<K> From<Handler<K>> for HandlerSpec<K> {
    fn from(handler: Handler<K>) -> Self {
        Self::Fn(handler)
    }
}

impl<K> From<bool> for HandlerSpec<K> {
    fn from(value: bool) -> Self {
        if value { Self::Missing } else { Self::False }
    }
}

impl<K> From<Option<Handler<K>>> for HandlerSpec<K> {
    fn from(handler: Option<Handler<K>>) -> Self {
        handler.map_or(Self::Missing, Self::Fn)
    }
}

impl<K> HandlerSpec<K> {
    /// A handler object `{ handler, data }`.
    pub fn object(handler: Handler<K>, data: impl Into<Value>) -> Self {
        Self::Object {
            handler,
            data: Some(data.into()),
        }
    }

    pub(crate) fn into_parts(self) -> (Callback<K>, Option<Value>) {
        match self {
            Self::Fn(h) => (Callback::Handler(h), None),
            Self::Object { handler, data } => (Callback::Handler(handler), data),
            Self::False | Self::Missing => (Callback::Noop, None),
        }
    }
}

/// What a binding runs.
#[derive(Clone, Debug)]
pub enum Callback<K> {
    /// A user handler.
    Handler(Handler<K>),
    /// Placeholder for `false` or missing handlers.
    Noop,
}

impl<K: 'static> Callback<K> {
    /// Runs the callback.
    pub fn call(&self, event: &mut EventObject<K>, args: &[Value]) -> HandlerOutput {
        match self {
            Self::Handler(h) => h.call(event, args),
            Self::Noop => HandlerOutput::NONE,
        }
    }

    /// Returns `true` if an unbind request for `spec` targets this callback.
    pub(crate) fn matches(&self, spec: &HandlerSpec<K>) -> bool {
        match (self, spec) {
            (Self::Handler(mine), HandlerSpec::Fn(h) | HandlerSpec::Object { handler: h, .. }) => {
                mine == h
            }
            (Self::Noop, HandlerSpec::False | HandlerSpec::Missing) => true,
            _ => false,
        }
    }
}

/// Identity of one binding, unique within an emitter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

/// One registered binding.
#[derive(Debug)]
pub struct HandlerEntry<K> {
    pub(crate) id: EntryId,
    pub(crate) ty: String,
    pub(crate) orig_type: String,
    pub(crate) namespaces: Namespaces,
    pub(crate) selector: Option<String>,
    pub(crate) data: Option<Value>,
    pub(crate) callback: Callback<K>,
    pub(crate) once: bool,
}

impl<K: 'static> HandlerEntry<K> {
    /// Unique id of this binding.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The type actually bound.
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// The type the caller asked for; differs from [`ty`](Self::ty) when a
    /// hook maps it (for example `mouseenter` bound as `mouseover`).
    pub fn orig_type(&self) -> &str {
        &self.orig_type
    }

    /// Namespaces of the binding.
    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Delegation selector; `None` for direct bindings.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// Payload exposed as `event.data`.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Whether the binding removes itself before its first run.
    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Identity of the bound handler; `None` for no-op bindings.
    pub fn guid(&self) -> Option<HandlerGuid> {
        match &self.callback {
            Callback::Handler(h) => Some(h.guid()),
            Callback::Noop => None,
        }
    }

    /// Runs the bound handler directly, bypassing any `handle` hook.
    pub fn invoke(&self, event: &mut EventObject<K>, args: &[Value]) -> HandlerOutput {
        self.callback.call(event, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let a = Handler::<u32>::new(|_, _| {});
        let b = a.clone();
        let c = Handler::<u32>::new(|_, _| {});
        assert_eq!(a, b);
        assert_eq!(a.guid(), b.guid());
        assert_ne!(a, c);
    }

    #[test]
    fn return_values_convert() {
        let h = Handler::<u32>::new(|_, _| false);
        let mut ev = EventObject::new("click");
        assert!(h.call(&mut ev, &[]).is_false());
        let h = Handler::<u32>::new(|_, args: &[Value]| args.first().cloned());
        assert_eq!(h.call(&mut ev, &[Value::from(3)]), HandlerOutput(Some(Value::from(3))));
    }

    #[test]
    fn noop_matches_false_only() {
        let h = Handler::<u32>::new(|_, _| {});
        assert!(Callback::<u32>::Noop.matches(&HandlerSpec::False));
        assert!(!Callback::<u32>::Noop.matches(&HandlerSpec::Fn(h.clone())));
        assert!(Callback::Handler(h.clone()).matches(&HandlerSpec::Fn(h.clone())));
        assert!(!Callback::Handler(h).matches(&HandlerSpec::False));
    }
}
