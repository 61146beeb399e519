// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator capabilities consumed by the emitter.
//!
//! The emitter owns no tree. It reaches the outside world through two
//! traits:
//!
//! - [`Tree`]: node classification, the parent chain and selector matching.
//! - [`Platform`]: native listener wiring, inline `on<type>` slots and
//!   native default actions.
//!
//! Anything implementing both is a [`Host`]. An in-memory implementation
//! lives in [`adapters::memory`](crate::adapters).

use alloc::rc::Rc;
use core::fmt;
use core::hash::Hash;

use serde_json::Value;

use crate::error::SelectorError;
use crate::event::{EventObject, NativeEvent};
use crate::handler::HandlerOutput;

/// Bounds shared by every node key: small, copyable and hashable.
pub trait NodeKey: Copy + Eq + Hash + fmt::Debug + 'static {}

impl<K: Copy + Eq + Hash + fmt::Debug + 'static> NodeKey for K {}

/// The callback an emitter registers with the platform for a target.
///
/// It is called with the node whose listener fires and the native event.
pub type Listener<K> = Rc<dyn Fn(K, &Rc<NativeEvent<K>>)>;

/// Tree-side capabilities.
pub trait Tree<K> {
    /// Whether bindings can be stored on `node`.
    ///
    /// Text and comment nodes return `false`; bindings and triggers on them
    /// are silently ignored.
    fn accepts_bindings(&self, node: K) -> bool {
        let _ = node;
        true
    }

    /// Whether `node` is an element, i.e. supports delegation and selector
    /// matching.
    fn is_element(&self, node: K) -> bool;

    /// Whether `node` is the top of the propagation path (the window).
    fn is_window(&self, node: K) -> bool {
        let _ = node;
        false
    }

    /// The next node on the propagation path (document → window at the top).
    fn parent_of(&self, node: K) -> Option<K>;

    /// Whether `element` matches `selector`.
    ///
    /// Returns an error for selectors that fail to parse.
    fn matches(&self, element: K, selector: &str) -> Result<bool, SelectorError>;

    /// Whether `element` is a disabled form control.
    fn is_disabled(&self, element: K) -> bool {
        let _ = element;
        false
    }
}

/// Platform-side capabilities.
pub trait Platform<K> {
    /// Attaches the target's listener for `ty`.
    fn add_listener(&self, target: K, ty: &str, listener: Listener<K>);

    /// Detaches the target's listener for `ty`.
    fn remove_listener(&self, target: K, ty: &str);

    /// Runs the target's inline `on<ty>` handler, if it has one.
    fn call_inline(
        &self,
        target: K,
        ty: &str,
        event: &mut EventObject<K>,
        args: &[Value],
    ) -> Option<HandlerOutput> {
        let _ = (target, ty, event, args);
        None
    }

    /// Performs the native default action of `ty` on `target` (for example
    /// moving focus). Returns `false` when the target has none.
    fn perform_default(&self, target: K, ty: &str) -> bool {
        let _ = (target, ty);
        false
    }

    /// The node that currently holds focus.
    fn active_element(&self) -> Option<K> {
        None
    }
}

/// A full collaborator: [`Tree`] plus [`Platform`].
pub trait Host<K>: Tree<K> + Platform<K> {}

impl<K, T: Tree<K> + Platform<K>> Host<K> for T {}

/// Iterator over the ancestors of a node, nearest first.
pub struct Ancestors<'a, K, T: ?Sized> {
    tree: &'a T,
    next: Option<K>,
}

impl<K: Copy, T: Tree<K> + ?Sized> Iterator for Ancestors<'_, K, T> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let current = self.next?;
        self.next = self.tree.parent_of(current);
        Some(current)
    }
}

impl<K: fmt::Debug, T: ?Sized> fmt::Debug for Ancestors<'_, K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ancestors")
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

/// Lazily walks the ancestors of `node` (excluding `node`), nearest first.
///
/// The walk is restartable: calling this again yields the same sequence as
/// long as the tree is unchanged.
pub fn ancestors<K: Copy, T: Tree<K> + ?Sized>(tree: &T, node: K) -> Ancestors<'_, K, T> {
    Ancestors {
        tree,
        next: tree.parent_of(node),
    }
}

/// Returns `true` if `node` is a strict descendant of `ancestor`.
pub fn contains<K: Copy + PartialEq, T: Tree<K> + ?Sized>(tree: &T, ancestor: K, node: K) -> bool {
    ancestors(tree, node).any(|a| a == ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    // 0 <- 1 <- 2 <- 3
    struct Chain;

    impl Tree<u32> for Chain {
        fn is_element(&self, _: u32) -> bool {
            true
        }

        fn parent_of(&self, node: u32) -> Option<u32> {
            node.checked_sub(1)
        }

        fn matches(&self, _: u32, _: &str) -> Result<bool, SelectorError> {
            Ok(false)
        }
    }

    #[test]
    fn ancestors_are_nearest_first_and_restartable() {
        let first: Vec<_> = ancestors(&Chain, 3).collect();
        let again: Vec<_> = ancestors(&Chain, 3).collect();
        assert_eq!(first, [2, 1, 0]);
        assert_eq!(first, again);
        assert_eq!(ancestors(&Chain, 0).count(), 0);
    }

    #[test]
    fn contains_is_strict() {
        assert!(contains(&Chain, 1, 3));
        assert!(!contains(&Chain, 3, 3));
        assert!(!contains(&Chain, 3, 1));
    }
}
