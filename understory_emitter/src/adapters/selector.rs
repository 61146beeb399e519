// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small CSS-like selector engine.
//!
//! Supported syntax:
//!
//! - compound selectors: `div`, `*`, `#id`, `.a.b`, `button.primary#ok`,
//! - the descendant (` `) and child (`>`) combinators,
//! - comma-separated lists.
//!
//! Anything else (attribute selectors, pseudo-classes, ...) is a parse
//! error. Tag names compare ASCII case-insensitively.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::SelectorError;

/// A borrowed view of one element, as seen by selector matching.
///
/// `classes` must be sorted and deduplicated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ElementInfo<'a> {
    /// Tag name.
    pub tag: &'a str,
    /// Element id.
    pub id: Option<&'a str>,
    /// Sorted, unique class names.
    pub classes: &'a [String],
}

/// The element tree selector matching walks.
pub trait SelectorTree<K> {
    /// The element view of `node`; `None` for non-elements.
    fn element(&self, node: K) -> Option<ElementInfo<'_>>;

    /// The parent of `node` if it is an element.
    fn parent_element(&self, node: K) -> Option<K>;
}

/// A single-element predicate: optional tag, ids and required classes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Compound {
    /// Required tag; `None` matches any.
    pub tag: Option<String>,
    /// Required ids (more than one never matches unless equal).
    pub ids: Vec<String>,
    /// Required classes, sorted and unique.
    pub classes: Vec<String>,
}

impl Compound {
    /// Returns `true` if `info` satisfies every part of the compound.
    #[must_use]
    pub fn matches(&self, info: &ElementInfo<'_>) -> bool {
        if let Some(tag) = &self.tag
            && !tag.eq_ignore_ascii_case(info.tag)
        {
            return false;
        }
        self.ids.iter().all(|id| info.id == Some(id.as_str())) && is_subset(&self.classes, info.classes)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds joined by combinators, matched right to left.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    // `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches<K: Copy, T: SelectorTree<K> + ?Sized>(&self, tree: &T, element: K) -> bool {
        let last = self.compounds.len() - 1;
        compound_at(tree, &self.compounds[last], element) && self.matches_left(tree, last, element)
    }

    fn matches_left<K: Copy, T: SelectorTree<K> + ?Sized>(&self, tree: &T, index: usize, element: K) -> bool {
        if index == 0 {
            return true;
        }
        let wanted = &self.compounds[index - 1];
        match self.combinators[index - 1] {
            Combinator::Child => tree.parent_element(element).is_some_and(|parent| {
                compound_at(tree, wanted, parent) && self.matches_left(tree, index - 1, parent)
            }),
            Combinator::Descendant => {
                let mut cursor = tree.parent_element(element);
                while let Some(ancestor) = cursor {
                    if compound_at(tree, wanted, ancestor) && self.matches_left(tree, index - 1, ancestor) {
                        return true;
                    }
                    cursor = tree.parent_element(ancestor);
                }
                false
            }
        }
    }
}

fn compound_at<K, T: SelectorTree<K> + ?Sized>(tree: &T, compound: &Compound, node: K) -> bool {
    tree.element(node).is_some_and(|info| compound.matches(&info))
}

/// A parsed, comma-separated selector list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList(Vec<Complex>);

impl SelectorList {
    /// Parses `source`.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser { source, pos: 0 };
        let mut list = Vec::new();
        loop {
            list.push(parser.complex()?);
            match parser.peek() {
                None => break,
                Some(b',') => parser.pos += 1,
                Some(_) => return Err(parser.error("unexpected character")),
            }
        }
        Ok(Self(list))
    }

    /// Returns `true` if `element` matches any selector of the list.
    pub fn matches<K: Copy, T: SelectorTree<K> + ?Sized>(&self, tree: &T, element: K) -> bool {
        self.0.iter().any(|complex| complex.matches(tree, element))
    }
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn error(&self, reason: &'static str) -> SelectorError {
        SelectorError {
            selector: self.source.to_string(),
            offset: self.pos,
            reason,
        }
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_ws();
        let mut compounds = alloc::vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let spaced = self.skip_ws();
            match self.peek() {
                None | Some(b',') => break,
                Some(b'>') => {
                    self.pos += 1;
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some(_) if spaced => combinators.push(Combinator::Descendant),
                Some(_) => return Err(self.error("unexpected character")),
            }
            compounds.push(self.compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();
        if self.peek() == Some(b'*') {
            self.pos += 1;
        } else if let Some(tag) = self.ident() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some(b'.') => {
                    self.pos += 1;
                    let class = self.ident().ok_or_else(|| self.error("expected class name"))?;
                    compound.classes.push(class.to_string());
                }
                Some(b'#') => {
                    self.pos += 1;
                    let id = self.ident().ok_or_else(|| self.error("expected id"))?;
                    compound.ids.push(id.to_string());
                }
                _ => break,
            }
        }
        if self.pos == start {
            return Err(self.error("expected selector"));
        }
        compound.classes.sort();
        compound.classes.dedup();
        Ok(compound)
    }

    fn ident(&mut self) -> Option<&'a str> {
        let source: &'a str = self.source;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80)
        {
            self.pos += 1;
        }
        let end = self.pos;
        (end > start).then(|| &source[start..end])
    }
}

fn is_subset(needles: &[String], haystack: &[String]) -> bool {
    let mut rest = haystack.iter();
    needles
        .iter()
        .all(|needle| rest.by_ref().any(|have| have == needle))
}
