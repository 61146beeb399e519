// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-node dispatch loop.
//!
//! One dispatch runs the handlers bound on a single node for one event:
//!
//! 1. the type's `pre_dispatch` hook may veto the whole pass,
//! 2. a handler queue is built from a snapshot of the node's bindings:
//!    for each element from the event target up to (excluding) the node, the
//!    delegated bindings whose selector matches it (deepest first), then the
//!    node's direct bindings,
//! 3. groups run while propagation is not stopped; inside a group, bindings
//!    run in insertion order while immediate propagation is not stopped,
//! 4. the `post_dispatch` hook runs.
//!
//! Handlers may bind, unbind and trigger re-entrantly; they see the snapshot
//! taken in step 2, except that one-shot bindings removed in the meantime are
//! skipped.

use alloc::rc::Rc;
use alloc::vec::Vec;

use serde_json::Value;

use crate::emitter::Emitter;
use crate::event::EventObject;
use crate::handler::{HandlerEntry, HandlerOutput};
use crate::hook::Verdict;
use crate::host::NodeKey;

/// Bindings that run with `current_target` set to `node`.
struct Group<K> {
    node: K,
    entries: Vec<Rc<HandlerEntry<K>>>,
}

/// Applies a handler's return value to the event.
///
/// Any value becomes the result; an explicit `false` additionally prevents
/// the default and stops propagation.
pub(crate) fn apply_output<K: NodeKey>(event: &mut EventObject<K>, output: HandlerOutput) {
    let Some(value) = output.0 else {
        return;
    };
    let is_false = value == Value::Bool(false);
    event.set_result(Some(value));
    if is_false {
        event.prevent_default();
        event.stop_propagation();
    }
}

impl<K: NodeKey> Emitter<K> {
    /// Runs the bindings of `node` for `event`.
    ///
    /// Returns [`Verdict::Veto`] if the type's `pre_dispatch` hook aborted
    /// the pass.
    pub(crate) fn dispatch(&self, node: K, event: &mut EventObject<K>, args: &[Value]) -> Verdict {
        event.set_delegate_target(node);
        let hook = self.hooks.get(event.ty());
        if let Some(gate) = hook.as_ref().and_then(|h| h.pre_dispatch.clone())
            && gate(node, event) == Verdict::Veto
        {
            tracing::debug!(node = ?node, event_type = %event.ty(), "dispatch vetoed by pre_dispatch");
            return Verdict::Veto;
        }

        let queue = self.handler_queue(node, event);
        'groups: for group in &queue {
            if event.is_propagation_stopped() {
                break;
            }
            event.set_current_target(group.node);
            for entry in &group.entries {
                if event.is_immediate_propagation_stopped() {
                    break 'groups;
                }
                if !entry.namespaces().satisfies(event.namespace()) {
                    continue;
                }
                if entry.is_once() && !self.remove_entry(node, entry) {
                    continue;
                }
                event.set_handle_entry(Some(entry.clone()));
                event.set_data(entry.data().cloned());
                let handle = self
                    .hooks
                    .get(entry.orig_type())
                    .and_then(|h| h.handle.clone());
                let output = match handle {
                    Some(handle) => handle(event, &**entry, args),
                    None => entry.invoke(event, args),
                };
                apply_output(event, output);
            }
        }
        event.set_handle_entry(None);

        if let Some(post) = hook.as_ref().and_then(|h| h.post_dispatch.clone()) {
            post(node, event);
        }
        Verdict::Proceed
    }

    fn handler_queue(&self, node: K, event: &EventObject<K>) -> Vec<Group<K>> {
        let (delegated, direct) = {
            let targets = self.targets.borrow();
            match targets.get(&node).and_then(|b| b.types.get(event.ty())) {
                Some(slot) => (slot.delegated.clone(), slot.direct.clone()),
                None => return Vec::new(),
            }
        };

        let mut queue = Vec::new();
        let is_click = event.ty() == "click";
        // Secondary-button clicks never reach delegated handlers.
        let secondary_click = is_click
            && event
                .get("button")
                .and_then(|b| b.as_u64())
                .is_some_and(|b| b >= 1);
        if !delegated.is_empty() && !secondary_click {
            let mut cursor = event.target().filter(|&t| t != node);
            while let Some(element) = cursor {
                if element == node {
                    break;
                }
                if self.host.is_element(element) && !(is_click && self.host.is_disabled(element)) {
                    let matched: Vec<_> = delegated
                        .iter()
                        .filter(|entry| self.selector_matches(element, entry))
                        .cloned()
                        .collect();
                    if !matched.is_empty() {
                        queue.push(Group {
                            node: element,
                            entries: matched,
                        });
                    }
                }
                cursor = self.host.parent_of(element);
            }
        }

        if !direct.is_empty() {
            queue.push(Group {
                node,
                entries: direct,
            });
        }
        queue
    }

    fn selector_matches(&self, element: K, entry: &HandlerEntry<K>) -> bool {
        let Some(selector) = entry.selector() else {
            return false;
        };
        match self.host.matches(element, selector) {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(%err, "selector failed during dispatch; treated as no match");
                false
            }
        }
    }
}
