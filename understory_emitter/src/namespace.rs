// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event type tokens and namespace sets.
//!
//! A type token such as `"click.menu.primary"` names a bare event type
//! (`click`) plus a set of namespaces (`menu`, `primary`). Namespaces never
//! take part in matching the bare type; they only filter which bindings an
//! `off` or a namespaced `trigger` touches.

use alloc::string::{String, ToString};
use core::fmt;

use smallvec::SmallVec;

/// A sorted, de-duplicated set of namespace labels.
///
/// Most bindings carry zero, one or two namespaces, so the labels are stored
/// inline.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespaces(SmallVec<[String; 2]>);

impl Namespaces {
    /// The empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from labels, sorting and dropping empty or repeated ones.
    #[must_use]
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: SmallVec<[String; 2]> = labels
            .into_iter()
            .filter(|s| !s.as_ref().is_empty())
            .map(|s| s.as_ref().to_string())
            .collect();
        set.sort();
        set.dedup();
        Self(set)
    }

    /// Parses a dot-joined namespace string (`"a.b"`).
    #[must_use]
    pub fn parse(joined: &str) -> Self {
        Self::from_labels(joined.split('.'))
    }

    /// Returns `true` if the set holds no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if `label` is in the set.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.0.binary_search_by(|l| l.as_str().cmp(label)).is_ok()
    }

    /// Iterates the labels in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Conjunctive filter test: `true` if every label of `filter` is present
    /// in `self`.
    ///
    /// An empty filter matches everything.
    #[must_use]
    pub fn satisfies(&self, filter: &Self) -> bool {
        let mut mine = self.0.iter();
        'outer: for wanted in &filter.0 {
            for have in mine.by_ref() {
                match have.cmp(wanted) {
                    core::cmp::Ordering::Less => {}
                    core::cmp::Ordering::Equal => continue 'outer,
                    core::cmp::Ordering::Greater => return false,
                }
            }
            return false;
        }
        true
    }

    /// Joins the labels with `.` (the form exposed as `event.namespace`).
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Debug for Namespaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A parsed type token: the bare type and its namespaces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeToken {
    /// Bare event type; empty for namespace-only tokens like `".ns"`.
    pub ty: String,
    /// Namespaces attached to the token.
    pub namespaces: Namespaces,
}

impl TypeToken {
    /// Parses `"type.ns1.ns2"`.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token.split_once('.') {
            Some((ty, rest)) => Self {
                ty: ty.to_string(),
                namespaces: Namespaces::parse(rest),
            },
            None => Self {
                ty: token.to_string(),
                namespaces: Namespaces::new(),
            },
        }
    }

    /// Returns `true` for tokens that only name namespaces.
    #[must_use]
    pub fn is_namespace_only(&self) -> bool {
        self.ty.is_empty()
    }
}

/// Splits a space-separated list of type tokens and parses each one.
pub fn parse_types(types: &str) -> impl Iterator<Item = TypeToken> + '_ {
    types.split_whitespace().map(TypeToken::parse)
}
