// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference collaborators.
//!
//! - [`selector`]: a compound CSS-like selector engine any tree can reuse
//!   through [`SelectorTree`](selector::SelectorTree).
//! - [`memory`] (`memory_host` feature): an in-memory document that
//!   implements [`Host`](crate::host::Host), used by the tests, benches and
//!   demos.

#[cfg(feature = "memory_host")]
pub mod memory;
pub mod selector;
