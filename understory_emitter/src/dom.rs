// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-node façade.
//!
//! [`Dom`] pairs an [`Emitter`] with one node and accepts the loose call
//! shapes of a jQuery-style API. Each shape is parsed into a canonical
//! request ([`BindArgs`], [`Unbind`], [`TriggerEvent`], [`ExtraArgs`])
//! through `From` conversions:
//!
//! | Call                                   | Meaning                          |
//! |----------------------------------------|----------------------------------|
//! | `on("click", handler)`                 | direct binding                   |
//! | `on("click", (json!(..), handler))`    | direct binding with data         |
//! | `on("click", (".item", handler))`      | delegated binding                |
//! | `on("click", (".item", data, handler))`| delegated binding with data      |
//! | `off("click")`, `off(".ns")`           | by type, by namespace            |
//! | `off(("click", handler))`              | by type and handler              |
//! | `off(("click", ".item"))`              | by type and selector             |
//! | `trigger("click.ns")`                  | namespaced trigger               |

use alloc::rc::Rc;
use alloc::string::{String, ToString};

use serde_json::Value;

use crate::emitter::{Binding, Emitter, ExtraArgs, TriggerEvent, Unbind};
use crate::error::EventError;
use crate::handler::{Handler, HandlerSpec};
use crate::host::NodeKey;

/// Selector, data and handler of a binding call.
#[derive(Clone, Debug)]
pub struct BindArgs<K> {
    /// Delegation selector.
    pub selector: Option<String>,
    /// Payload exposed as `event.data`.
    pub data: Option<Value>,
    /// The handler.
    pub handler: HandlerSpec<K>,
}

impl<K> BindArgs<K> {
    fn into_binding(self, types: &str) -> Binding<K> {
        Binding {
            types: types.to_string(),
            selector: self.selector,
            data: self.data,
            handler: self.handler,
            once: false,
        }
    }
}

impl<K> From<HandlerSpec<K>> for BindArgs<K> {
    fn from(handler: HandlerSpec<K>) -> Self {
        Self {
            selector: None,
            data: None,
            handler,
        }
    }
}

impl<K> From<Handler<K>> for BindArgs<K> {
    fn from(handler: Handler<K>) -> Self {
        HandlerSpec::from(handler).into()
    }
}

impl<K> From<bool> for BindArgs<K> {
    fn from(handler: bool) -> Self {
        HandlerSpec::from(handler).into()
    }
}

impl<K, H: Into<HandlerSpec<K>>> From<(Value, H)> for BindArgs<K> {
    fn from((data, handler): (Value, H)) -> Self {
        Self {
            selector: None,
            data: Some(data),
            handler: handler.into(),
        }
    }
}

impl<K, H: Into<HandlerSpec<K>>> From<(&str, H)> for BindArgs<K> {
    fn from((selector, handler): (&str, H)) -> Self {
        Self {
            selector: Some(selector.to_string()),
            data: None,
            handler: handler.into(),
        }
    }
}

impl<K, H: Into<HandlerSpec<K>>> From<(&str, Value, H)> for BindArgs<K> {
    fn from((selector, data, handler): (&str, Value, H)) -> Self {
        Self {
            selector: Some(selector.to_string()),
            data: Some(data),
            handler: handler.into(),
        }
    }
}

impl<K> From<&str> for Unbind<K> {
    fn from(types: &str) -> Self {
        Self::types(types)
    }
}

impl<K> From<(&str, Handler<K>)> for Unbind<K> {
    fn from((types, handler): (&str, Handler<K>)) -> Self {
        Self::types(types).with_handler(handler)
    }
}

impl<K> From<(&str, HandlerSpec<K>)> for Unbind<K> {
    fn from((types, handler): (&str, HandlerSpec<K>)) -> Self {
        Self::types(types).with_handler(handler)
    }
}

impl<K> From<(&str, bool)> for Unbind<K> {
    fn from((types, handler): (&str, bool)) -> Self {
        Self::types(types).with_handler(handler)
    }
}

impl<K> From<(&str, &str)> for Unbind<K> {
    fn from((types, selector): (&str, &str)) -> Self {
        Self::types(types).with_selector(selector)
    }
}

impl<K> From<(&str, &str, Handler<K>)> for Unbind<K> {
    fn from((types, selector, handler): (&str, &str, Handler<K>)) -> Self {
        Self::types(types)
            .with_selector(selector)
            .with_handler(handler)
    }
}

/// An [`Emitter`] bound to one node.
#[derive(Clone, Debug)]
pub struct Dom<K: NodeKey> {
    emitter: Rc<Emitter<K>>,
    node: K,
}

impl<K: NodeKey> Dom<K> {
    /// Wraps `node`.
    pub fn new(emitter: &Rc<Emitter<K>>, node: K) -> Self {
        Self {
            emitter: emitter.clone(),
            node,
        }
    }

    /// The wrapped node.
    pub fn node(&self) -> K {
        self.node
    }

    /// The emitter this façade forwards to.
    pub fn emitter(&self) -> &Rc<Emitter<K>> {
        &self.emitter
    }

    /// Binds `args` to the space-separated `types`.
    pub fn on(&self, types: &str, args: impl Into<BindArgs<K>>) -> Result<&Self, EventError> {
        self.emitter.on(self.node, args.into().into_binding(types))?;
        Ok(self)
    }

    /// Binds each `(types, args)` pair.
    pub fn on_map<I, T, A>(&self, map: I) -> Result<&Self, EventError>
    where
        I: IntoIterator<Item = (T, A)>,
        T: AsRef<str>,
        A: Into<BindArgs<K>>,
    {
        for (types, args) in map {
            self.on(types.as_ref(), args)?;
        }
        Ok(self)
    }

    /// Like [`on`](Self::on), but each binding runs at most once.
    pub fn once(&self, types: &str, args: impl Into<BindArgs<K>>) -> Result<&Self, EventError> {
        self.emitter
            .once(self.node, args.into().into_binding(types))?;
        Ok(self)
    }

    /// Like [`on_map`](Self::on_map), but each binding runs at most once.
    pub fn once_map<I, T, A>(&self, map: I) -> Result<&Self, EventError>
    where
        I: IntoIterator<Item = (T, A)>,
        T: AsRef<str>,
        A: Into<BindArgs<K>>,
    {
        for (types, args) in map {
            self.once(types.as_ref(), args)?;
        }
        Ok(self)
    }

    /// Removes the bindings selected by `unbind`.
    pub fn off(&self, unbind: impl Into<Unbind<K>>) -> &Self {
        self.emitter.off(self.node, unbind.into());
        self
    }

    /// Removes each `(types, handler)` pair.
    pub fn off_map<I, T, H>(&self, map: I) -> &Self
    where
        I: IntoIterator<Item = (T, H)>,
        T: AsRef<str>,
        H: Into<HandlerSpec<K>>,
    {
        for (types, handler) in map {
            self.emitter
                .off(self.node, Unbind::types(types.as_ref()).with_handler(handler));
        }
        self
    }

    /// Removes every binding of the node.
    pub fn off_all(&self) -> &Self {
        self.emitter.off_all(self.node);
        self
    }

    /// Triggers `event` on the node and returns its result.
    pub fn trigger(&self, event: impl Into<TriggerEvent<K>>) -> Option<Value> {
        self.emitter.trigger(self.node, event, (), false)
    }

    /// Triggers `event` with extra handler arguments.
    pub fn trigger_with(
        &self,
        event: impl Into<TriggerEvent<K>>,
        args: impl Into<ExtraArgs>,
        only_handlers: bool,
    ) -> Option<Value> {
        self.emitter.trigger(self.node, event, args, only_handlers)
    }
}
