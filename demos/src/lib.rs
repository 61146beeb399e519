// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for the emitter demos.

use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use understory_emitter::Emitter;
use understory_emitter::adapters::memory::{MemoryDocument, NodeId};

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Run a demo with `RUST_LOG=understory_emitter=trace` to watch listeners
/// attach and events dispatch.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .try_init();
}

/// A fresh document and an emitter over it.
pub fn document() -> (Rc<MemoryDocument>, Rc<Emitter<NodeId>>) {
    let doc = Rc::new(MemoryDocument::new());
    let emitter = Emitter::<NodeId>::new(doc.clone());
    (doc, emitter)
}
