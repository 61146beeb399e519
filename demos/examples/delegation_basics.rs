// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Delegation basics.
//!
//! Bind one delegated handler on a list, then click items that did not exist
//! when the handler was bound.
//!
//! Run:
//! - `cargo run -p understory_demos --example delegation_basics`

use std::rc::Rc;

use serde_json::json;
use understory_demos::{document, init_tracing};
use understory_emitter::adapters::memory::NodeId;
use understory_emitter::{Dom, EventObject, Handler, NativeEvent, Value};

fn main() {
    init_tracing();
    let (doc, emitter) = document();
    let list = doc.element(doc.body(), "ul", &["todo"]);
    let list_dom = Dom::new(&emitter, list);

    list_dom
        .on(
            "click.todo",
            (
                "li.item",
                json!({ "list": "todo" }),
                Handler::new(|event: &mut EventObject<NodeId>, _: &[Value]| {
                    tracing::info!(
                        item = ?event.current_target(),
                        data = ?event.data(),
                        "item clicked"
                    );
                }),
            ),
        )
        .expect("valid selector");

    // Items are added after binding; delegation still reaches them.
    let items: Vec<NodeId> = (0..3)
        .map(|_| doc.element(list, "li", &["item"]))
        .collect();
    for &item in &items {
        doc.dispatch_native(item, &Rc::new(NativeEvent::mouse("click")));
    }

    // A plain click on the list itself matches no item.
    list_dom.trigger("click");

    // Namespaced unbinding removes the handler and the platform listener.
    list_dom.off(".todo");
    tracing::info!(
        listeners = doc.listener_count(),
        bound = emitter.has_bindings(list),
        "after off(.todo)"
    );
}
