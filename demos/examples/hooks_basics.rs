// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hook basics.
//!
//! Register a custom hook that counts dispatches and vetoes triggers while
//! a flag is set, and watch the built-in enter/leave emulation.
//!
//! Run:
//! - `cargo run -p understory_demos --example hooks_basics`

use std::cell::Cell;
use std::rc::Rc;

use understory_demos::{document, init_tracing};
use understory_emitter::adapters::memory::NodeId;
use understory_emitter::hook::{Hook, Verdict};
use understory_emitter::{Dom, EventObject, Handler, NativeEvent, Value};

fn main() {
    init_tracing();
    let (doc, emitter) = document();
    let panel = doc.element(doc.body(), "section", &["panel"]);
    let button = doc.element(panel, "button", &[]);

    let locked = Rc::new(Cell::new(false));
    let gate = locked.clone();
    emitter.hooks().register(
        "save",
        Hook::<NodeId>::new()
            .on_trigger(move |_, _, _| if gate.get() { Verdict::Veto } else { Verdict::Proceed })
            .on_post_dispatch(|node, event| {
                tracing::info!(node = ?node, result = ?event.result(), "save dispatched");
            }),
    );

    let panel_dom = Dom::new(&emitter, panel);
    panel_dom
        .on(
            "save",
            Handler::new(|_: &mut EventObject<NodeId>, args: &[Value]| {
                Value::from(format!("saved {} field(s)", args.len()))
            }),
        )
        .expect("direct binding");

    let result = Dom::new(&emitter, button).trigger_with("save", serde_json::json!(["a", "b"]), false);
    tracing::info!(?result, "unlocked trigger");
    locked.set(true);
    let result = Dom::new(&emitter, button).trigger("save");
    tracing::info!(?result, "locked trigger");

    panel_dom
        .on(
            "mouseenter",
            Handler::new(|event: &mut EventObject<NodeId>, _: &[Value]| {
                tracing::info!(ty = event.ty(), "entered panel");
            }),
        )
        .expect("direct binding");
    // Entering the panel from the body fires; moving onto the button does not.
    doc.dispatch_native(
        panel,
        &Rc::new(NativeEvent::mouse("mouseover").with_related_target(doc.body())),
    );
    doc.dispatch_native(
        button,
        &Rc::new(NativeEvent::mouse("mouseover").with_related_target(panel)),
    );
}
