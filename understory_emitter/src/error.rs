// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Only binding can fail. Unbinding, triggering and hook vetoes never produce
//! errors; they are reported through the absence of side effects.

use alloc::string::String;

/// A delegation selector the tree collaborator could not parse.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector `{selector}` at offset {offset}: {reason}")]
pub struct SelectorError {
    /// The selector source text.
    pub selector: String,
    /// Byte offset of the first offending character.
    pub offset: usize,
    /// Short description of the problem.
    pub reason: &'static str,
}

/// Errors returned by binding operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The delegation selector failed to parse.
    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),
    /// A selector was supplied for a target that is not an element.
    #[error("delegated bindings require an element target")]
    DelegationUnsupported,
}
