// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_emitter --heading-base-level=0

//! Understory Emitter: a delegating event emitter over an abstract node tree.
//!
//! ## Overview
//!
//! This crate stores event bindings per node and runs them when native
//! events arrive or when events are triggered synthetically. It owns no tree
//! and no event loop: a [`Host`](host::Host) supplies the parent chain,
//! selector matching and native listener wiring.
//!
//! Bindings may carry:
//!
//! - **namespaces** (`"click.menu.main"`), which scope `off` and `trigger`,
//! - a **selector**, which delegates the binding to matching descendants,
//! - **data**, exposed to the handler as `event.data()`,
//! - a **once** flag, which removes the binding before its first run.
//!
//! ## Dispatch
//!
//! For each node an event reaches, delegated handlers run first, walking
//! from the event target up towards the node (deepest matching element
//! first), then the node's direct handlers. A handler returning `false`
//! prevents the default action and stops propagation; any other return value
//! becomes the event's `result`.
//!
//! ## Hooks
//!
//! A [`HookRegistry`](hook::HookRegistry) customizes single event types:
//! remapping the bound type, gating triggers and dispatches, wrapping handler
//! calls, and controlling listener setup. The [`builtin`] hooks emulate
//! non-bubbling and enter/leave types.
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_emitter::adapters::memory::{MemoryDocument, NodeId};
//! use understory_emitter::{Dom, Emitter, EventObject, Handler, NativeEvent, Value};
//!
//! let doc = Rc::new(MemoryDocument::new());
//! let list = doc.element(doc.body(), "ul", &["menu"]);
//! let item = doc.element(list, "li", &["item"]);
//!
//! let emitter = Emitter::<NodeId>::new(doc.clone());
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = seen.clone();
//! Dom::new(&emitter, list)
//!     .on(
//!         "click.menu",
//!         (
//!             ".item",
//!             Handler::new(move |event: &mut EventObject<NodeId>, _: &[Value]| {
//!                 log.borrow_mut().push(event.current_target());
//!             }),
//!         ),
//!     )
//!     .unwrap();
//!
//! // A native click on the item reaches the list's delegated binding.
//! doc.dispatch_native(item, &Rc::new(NativeEvent::mouse("click")));
//! assert_eq!(*seen.borrow(), [Some(item)]);
//!
//! // Triggered events follow the same path.
//! Dom::new(&emitter, item).trigger("click");
//! assert_eq!(seen.borrow().len(), 2);
//!
//! Dom::new(&emitter, list).off(".menu");
//! assert!(!emitter.has_bindings(list));
//! ```
//!
//! ## Adapters
//!
//! The [`adapters`] module carries a small selector engine and, with the
//! `memory_host` feature, an in-memory document used by tests and demos.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod adapters;
pub mod builtin;
mod dispatch;
pub mod dom;
pub mod emitter;
pub mod error;
pub mod event;
pub mod handler;
pub mod hook;
pub mod host;
pub mod namespace;

pub use serde_json::Value;

pub use dom::{BindArgs, Dom};
pub use emitter::{Binding, Emitter, EmitterConfig, ExtraArgs, TriggerEvent, Unbind};
pub use error::{EventError, SelectorError};
pub use event::{EventFlags, EventObject, EventProperties, NativeEvent, TriggerMode};
pub use handler::{Handler, HandlerEntry, HandlerOutput, HandlerSpec};
pub use namespace::Namespaces;
