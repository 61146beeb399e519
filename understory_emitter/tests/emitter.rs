// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `understory_emitter` crate.
//!
//! These drive the public API end to end over the in-memory document:
//! binding and unbinding through [`Dom`], triggers, native delivery,
//! delegation order, propagation control and hooks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;
use understory_emitter::adapters::memory::{MemoryDocument, NodeId};
use understory_emitter::hook::{Attach, Hook, Verdict};
use understory_emitter::host::Platform;
use understory_emitter::{
    Dom, Emitter, EventError, EventObject, Handler, HandlerOutput, HandlerSpec, NativeEvent,
    TriggerMode, Unbind, Value,
};

/// A handler that records every call.
#[derive(Clone)]
struct Spy {
    handler: Handler<NodeId>,
    calls: Rc<RefCell<Vec<Call>>>,
}

#[derive(Clone, Debug)]
struct Call {
    ty: String,
    data: Option<Value>,
    args: Vec<Value>,
    current: Option<NodeId>,
    delegate: Option<NodeId>,
    trigger: Option<TriggerMode>,
    entry: Option<String>,
    prevented: bool,
}

impl Spy {
    fn new() -> Self {
        Self::with(|_| HandlerOutput::NONE)
    }

    fn with(f: impl Fn(&mut EventObject<NodeId>) -> HandlerOutput + 'static) -> Self {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let handler = Handler::new(move |event: &mut EventObject<NodeId>, args: &[Value]| {
            log.borrow_mut().push(Call {
                ty: event.ty().to_string(),
                data: event.data().cloned(),
                args: args.to_vec(),
                current: event.current_target(),
                delegate: event.delegate_target(),
                trigger: event.is_trigger(),
                entry: event.handle_entry().map(|e| e.orig_type().to_string()),
                prevented: event.is_default_prevented(),
            });
            f(event)
        });
        Self { handler, calls }
    }

    fn returning_false() -> Self {
        Self::with(|_| HandlerOutput::from(false))
    }

    fn h(&self) -> Handler<NodeId> {
        self.handler.clone()
    }

    fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn call(&self, index: usize) -> Call {
        self.calls.borrow()[index].clone()
    }
}

fn counter() -> (Rc<Cell<usize>>, impl Fn() + Clone + 'static) {
    let hits = Rc::new(Cell::new(0));
    let bump = {
        let hits = hits.clone();
        move || hits.set(hits.get() + 1)
    };
    (hits, bump)
}

/// ```text
/// <div>                       container
///   <div class="one common">  one
///   <div class="two common">  two
///   <div class="three">       three
///     <div class="four">      four
/// ```
struct Fixture {
    doc: Rc<MemoryDocument>,
    emitter: Rc<Emitter<NodeId>>,
    container: NodeId,
    one: NodeId,
    two: NodeId,
    three: NodeId,
    four: NodeId,
}

impl Fixture {
    fn new() -> Self {
        let doc = Rc::new(MemoryDocument::new());
        let emitter = Emitter::<NodeId>::new(doc.clone());
        let container = doc.element(doc.body(), "div", &[]);
        let one = doc.element(container, "div", &["one", "common"]);
        let two = doc.element(container, "div", &["two", "common"]);
        let three = doc.element(container, "div", &["three"]);
        let four = doc.element(three, "div", &["four"]);
        Self {
            doc,
            emitter,
            container,
            one,
            two,
            three,
            four,
        }
    }

    fn dom(&self, node: NodeId) -> Dom<NodeId> {
        Dom::new(&self.emitter, node)
    }

    /// A fresh `div` appended to `body`.
    fn div(&self) -> Dom<NodeId> {
        self.dom(self.doc.element(self.doc.body(), "div", &[]))
    }

    fn click(&self, node: NodeId) -> bool {
        self.doc
            .dispatch_native(node, &Rc::new(NativeEvent::mouse("click")))
    }
}

#[test]
fn on_binds_single_event() {
    let fx = Fixture::new();
    let div = fx.div();
    let spy = Spy::new();
    div.on("click", spy.h()).unwrap();
    div.trigger("click");
    assert_eq!(spy.count(), 1);
    div.trigger("click");
    assert_eq!(spy.count(), 2);
}

#[test]
fn on_map_binds_each_type() {
    let fx = Fixture::new();
    let div = fx.div();
    let click = Spy::new();
    let dblclick = Spy::new();
    div.on_map([("click", click.h()), ("dblclick", dblclick.h())])
        .unwrap();
    div.trigger("click");
    div.trigger("dblclick");
    div.trigger("click");
    assert_eq!((click.count(), dblclick.count()), (2, 1));
}

#[test]
fn handler_objects_carry_their_data() {
    let fx = Fixture::new();
    let div = fx.div();
    let plain = Spy::new();
    let with_data = Spy::new();
    div.on(
        "click",
        HandlerSpec::Object {
            handler: plain.h(),
            data: None,
        },
    )
    .unwrap();
    div.on("click", HandlerSpec::object(with_data.h(), json!({ "from": "object" })))
        .unwrap();
    div.trigger("click");
    assert_eq!(plain.count(), 1);
    assert_eq!(with_data.call(0).data, Some(json!({ "from": "object" })));

    // Call data wins over object data.
    let fresh = fx.div();
    fresh
        .on(
            "click",
            (json!(1), HandlerSpec::object(with_data.h(), json!(2))),
        )
        .unwrap();
    fresh.trigger("click");
    assert_eq!(with_data.call(1).data, Some(json!(1)));
}

#[test]
fn text_nodes_ignore_bindings() {
    let fx = Fixture::new();
    let text = fx.doc.create_text();
    fx.doc.append(fx.doc.body(), text);
    let spy = Spy::new();
    fx.dom(text).on("click", spy.h()).unwrap();
    assert_eq!(fx.dom(text).trigger("click"), None);
    assert_eq!(spy.count(), 0);
    assert!(!fx.emitter.has_bindings(text));
}

#[test]
fn delegated_binding_runs_for_matching_descendant() {
    let fx = Fixture::new();
    let spy = Spy::new();
    fx.dom(fx.container).on("click", (".one", spy.h())).unwrap();
    fx.dom(fx.one).trigger("click");
    assert_eq!(spy.count(), 1);
    assert_eq!(spy.call(0).current, Some(fx.one));
    fx.dom(fx.one).trigger("click");
    assert_eq!(spy.count(), 2);

    // Neither the container itself nor a sibling matches.
    fx.dom(fx.container).trigger("click");
    fx.dom(fx.two).trigger("click");
    assert_eq!(spy.count(), 2);
}

#[test]
fn invalid_delegation_is_rejected() {
    let fx = Fixture::new();
    let spy = Spy::new();
    let err = fx
        .dom(fx.container)
        .on("click", ("div[", spy.h()))
        .unwrap_err();
    assert!(matches!(err, EventError::InvalidSelector(_)));

    let object = fx.doc.create_object();
    assert_eq!(
        fx.dom(object).on("click", (".one", spy.h())).unwrap_err(),
        EventError::DelegationUnsupported
    );

    // Selectors matching nothing are fine.
    assert!(fx.dom(fx.container).on("click", (".unknown", spy.h())).is_ok());
}

#[test]
fn data_is_exposed_to_every_call() {
    let fx = Fixture::new();
    let div = fx.div();
    let spy = Spy::new();
    div.on("click", (json!({ "foo": "bar" }), spy.h())).unwrap();
    div.trigger("click");
    div.trigger("click");
    assert_eq!(spy.call(0).data, Some(json!({ "foo": "bar" })));
    assert_eq!(spy.call(1).data, Some(json!({ "foo": "bar" })));
}

#[test]
fn placeholder_handlers_bind_without_effect() {
    let fx = Fixture::new();
    let div = fx.div();
    div.on("click", false).unwrap();
    div.on("click", HandlerSpec::Missing).unwrap();
    assert_eq!(fx.emitter.bindings(div.node(), "click").len(), 2);
    assert_eq!(div.trigger("click"), None);

    // Namespace-only tokens are skipped.
    let spy = Spy::new();
    div.on(".ns", spy.h()).unwrap();
    assert_eq!(fx.emitter.bound_types(div.node()), ["click"]);
}

#[test]
fn once_runs_a_single_time() {
    let fx = Fixture::new();
    let div = fx.div();
    let plain = Spy::new();
    let namespaced = Spy::new();
    div.once("click", plain.h()).unwrap();
    div.once("click.ns", namespaced.h()).unwrap();
    div.trigger("click");
    div.trigger("click");
    assert_eq!((plain.count(), namespaced.count()), (1, 1));
    assert!(!fx.emitter.has_bindings(div.node()));
}

#[test]
fn once_survives_reentrant_trigger() {
    let fx = Fixture::new();
    let div = fx.div();
    let (hits, bump) = counter();
    let emitter = Rc::downgrade(&fx.emitter);
    let node = div.node();
    div.once(
        "ping",
        Handler::new(move |_: &mut EventObject<NodeId>, _: &[Value]| {
            bump();
            if let Some(emitter) = emitter.upgrade() {
                emitter.trigger(node, "ping", (), false);
            }
        }),
    )
    .unwrap();
    div.trigger("ping");
    assert_eq!(hits.get(), 1);
}

#[test]
fn once_map_binds_each_type_once() {
    let fx = Fixture::new();
    let div = fx.div();
    let a = Spy::new();
    let b = Spy::new();
    div.once_map([("a", a.h()), ("b", b.h())]).unwrap();
    for _ in 0..2 {
        div.trigger("a");
        div.trigger("b");
    }
    assert_eq!((a.count(), b.count()), (1, 1));
}

#[test]
fn off_by_handler_type_and_namespace() {
    let fx = Fixture::new();
    let div = fx.div();
    let s1 = Spy::new();
    let s2 = Spy::new();
    let s3 = Spy::new();
    div.on("click.ns", s1.h()).unwrap();
    div.on("click.ns", s2.h()).unwrap();
    div.on("click", s3.h()).unwrap();
    div.trigger("click");

    div.off(("click", s1.h()));
    div.trigger("click");
    assert_eq!((s1.count(), s2.count(), s3.count()), (1, 2, 2));

    div.off(".ns");
    div.trigger("click");
    assert_eq!((s1.count(), s2.count(), s3.count()), (1, 2, 3));

    div.off("click");
    div.trigger("click");
    assert_eq!(s3.count(), 3);
    assert!(!fx.emitter.has_bindings(div.node()));
}

#[test]
fn off_map_removes_each_pair() {
    let fx = Fixture::new();
    let div = fx.div();
    let s1 = Spy::new();
    let s2 = Spy::new();
    let s3 = Spy::new();
    div.on("click.ns", s1.h()).unwrap();
    div.on("click.ns", s2.h()).unwrap();
    div.on("click", s3.h()).unwrap();
    div.off_map([("click.ns", s1.h()), ("click", s3.h())]);
    div.trigger("click");
    assert_eq!((s1.count(), s2.count(), s3.count()), (0, 1, 0));
}

#[test]
fn off_delegated_by_selector() {
    let fx = Fixture::new();
    let container = fx.dom(fx.container);
    let spy = Spy::new();
    let direct = Spy::new();
    container.on("click", (".one", spy.h())).unwrap();
    container.on("click", direct.h()).unwrap();

    container.off(("click", ".two"));
    fx.dom(fx.one).trigger("click");
    assert_eq!(spy.count(), 1);

    container.off(("click", ".one"));
    fx.dom(fx.one).trigger("click");
    assert_eq!((spy.count(), direct.count()), (1, 2));

    container.on("click", (".one", spy.h())).unwrap();
    container.on("click", (".two", spy.h())).unwrap();
    container.off(("click", "**"));
    fx.dom(fx.one).trigger("click");
    fx.dom(fx.two).trigger("click");
    assert_eq!((spy.count(), direct.count()), (1, 4));
}

#[test]
fn off_without_bindings_is_a_no_op() {
    let fx = Fixture::new();
    let div = fx.div();
    div.off(("click", false));
    div.off(Unbind::all());
    div.off_all();
    assert!(!fx.emitter.has_bindings(div.node()));
}

#[test]
fn listener_attaches_on_first_binding_and_detaches_on_last() {
    let fx = Fixture::new();
    let div = fx.div();
    let a = Spy::new();
    let b = Spy::new();
    div.on("click", a.h()).unwrap();
    div.on("click.x", b.h()).unwrap();
    assert_eq!(fx.doc.attach_count(), 1);
    assert!(fx.doc.has_listener(div.node(), "click"));

    div.off(("click", a.h()));
    assert_eq!(fx.doc.detach_count(), 0);
    div.off(".x");
    assert_eq!(fx.doc.detach_count(), 1);
    assert!(!fx.doc.has_listener(div.node(), "click"));

    div.on("click", a.h()).unwrap();
    assert_eq!(fx.doc.attach_count(), 2);
}

#[test]
fn namespaced_trigger_runs_only_matching_bindings() {
    let fx = Fixture::new();
    let div = fx.div();
    let s1 = Spy::new();
    let s2 = Spy::new();
    let s3 = Spy::new();
    div.on("click.ns", s1.h()).unwrap();
    div.on("click.ns", s2.h()).unwrap();
    div.on("click", s3.h()).unwrap();
    div.trigger("click");
    div.trigger("click.ns");
    assert_eq!((s1.count(), s2.count(), s3.count()), (2, 2, 1));

    let mut options = serde_json::Map::new();
    options.insert("namespace".to_string(), json!("ns"));
    div.trigger(EventObject::with_options("click", options));
    assert_eq!((s1.count(), s2.count(), s3.count()), (3, 3, 1));
}

#[test]
fn trigger_also_runs_inline_handler() {
    let fx = Fixture::new();
    let div = fx.div();
    let bound = Spy::new();
    let inline = Spy::returning_false();
    div.on("click", bound.h()).unwrap();
    fx.doc.set_inline(div.node(), "click", inline.h());
    let result = div.trigger("click");
    assert_eq!((bound.count(), inline.count()), (1, 1));
    assert_eq!(result, Some(Value::Bool(false)));
}

#[test]
fn trigger_accepts_native_events_and_descriptors() {
    let fx = Fixture::new();
    let div = fx.div();
    let s1 = Spy::new();
    let s2 = Spy::new();
    div.on("click.ns", s1.h()).unwrap();
    div.on("click", s2.h()).unwrap();

    let native = Rc::new(NativeEvent::init("click", true, true));
    native.prevent_default();
    div.trigger(EventObject::from_native(native));
    assert_eq!((s1.count(), s2.count()), (1, 1));
    assert!(s2.call(0).prevented);

    div.trigger(json!({ "type": "click" }));
    assert_eq!((s1.count(), s2.count()), (2, 2));

    // A descriptor without a type triggers nothing.
    assert_eq!(div.trigger(json!({ "kind": "click" })), None);
    assert_eq!(s2.count(), 2);
}

#[test]
fn custom_events_on_plain_objects() {
    let fx = Fixture::new();
    let div = fx.div();
    let spy = Spy::new();
    div.on("foo", spy.h()).unwrap();
    div.trigger("foo");
    assert_eq!(spy.count(), 1);

    let object = fx.doc.create_object();
    let on_object = Spy::new();
    fx.dom(object).on("foo", on_object.h()).unwrap();
    fx.emitter.trigger(object, "foo", (), false);
    assert_eq!(on_object.count(), 1);
}

#[test]
fn trigger_passes_extra_args() {
    let fx = Fixture::new();
    let div = fx.div();
    let spy = Spy::new();
    div.on("click", spy.h()).unwrap();
    div.trigger("click");
    div.trigger_with("click", json!(1), false);
    div.trigger_with("click", json!([1, { "foo": "bar" }]), false);
    assert!(spy.call(0).args.is_empty());
    assert_eq!(spy.call(1).args, [json!(1)]);
    assert_eq!(spy.call(2).args, [json!(1), json!({ "foo": "bar" })]);
}

#[test]
fn returning_false_stops_propagation() {
    let fx = Fixture::new();
    let container = fx.dom(fx.container);
    let direct = Spy::new();
    let delegated = Spy::new();
    let stopper = Spy::returning_false();
    container.on("click", direct.h()).unwrap();
    container.on("click", (".one", delegated.h())).unwrap();
    fx.dom(fx.one).trigger("click");
    assert_eq!((direct.count(), delegated.count()), (1, 1));
    // Delegated handlers run before direct ones.
    assert_eq!(delegated.call(0).current, Some(fx.one));
    assert_eq!(direct.call(0).current, Some(fx.container));
    assert_eq!(delegated.call(0).delegate, Some(fx.container));
    assert_eq!(direct.call(0).delegate, Some(fx.container));
    assert_eq!(delegated.call(0).entry.as_deref(), Some("click"));
    assert_eq!(delegated.call(0).trigger, Some(TriggerMode::Synthetic));

    container.off(("click", ".one", delegated.h()));
    container.on("click", (".one", stopper.h())).unwrap();
    let result = fx.dom(fx.one).trigger("click");
    assert_eq!((direct.count(), stopper.count()), (1, 1));
    assert_eq!(result, Some(Value::Bool(false)));
}

#[test]
fn deepest_delegate_runs_first() {
    let fx = Fixture::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let record = |label: &'static str| {
        let order = order.clone();
        Handler::new(move |_: &mut EventObject<NodeId>, _: &[Value]| {
            order.borrow_mut().push(label);
        })
    };
    let container = fx.dom(fx.container);
    container.on("click", (".three", record("three"))).unwrap();
    container.on("click", (".four", record("four"))).unwrap();
    container.on("click", record("direct")).unwrap();
    fx.dom(fx.four).trigger("click");
    assert_eq!(*order.borrow(), ["four", "three", "direct"]);
}

fn immediate_stop_fixture() -> (Fixture, Spy, Spy, Spy, Spy) {
    let fx = Fixture::new();
    let direct = Spy::new();
    let stopper = Spy::with(|event| {
        event.stop_immediate_propagation();
        HandlerOutput::NONE
    });
    let two = Spy::new();
    let three = Spy::new();
    let container = fx.dom(fx.container);
    container.on("click", direct.h()).unwrap();
    container.on("click", (".one", stopper.h())).unwrap();
    container.on("click", (".common", two.h())).unwrap();
    container.on("click", (".three", three.h())).unwrap();
    (fx, direct, stopper, two, three)
}

#[test]
fn stop_immediate_propagation_on_trigger() {
    let (fx, direct, stopper, common, three) = immediate_stop_fixture();
    fx.dom(fx.one).trigger("click");
    assert_eq!(
        (direct.count(), stopper.count(), common.count(), three.count()),
        (0, 1, 0, 0)
    );
}

#[test]
fn stop_immediate_propagation_on_native_event() {
    let (fx, direct, stopper, common, three) = immediate_stop_fixture();
    let body = Spy::new();
    fx.dom(fx.doc.body()).on("click", body.h()).unwrap();
    fx.click(fx.one);
    assert_eq!(
        (direct.count(), stopper.count(), common.count(), three.count()),
        (0, 1, 0, 0)
    );
    assert_eq!(body.count(), 0);
}

#[test]
fn prevented_default_is_visible_further_up() {
    let fx = Fixture::new();
    let outer = Spy::new();
    fx.dom(fx.container).on("click", outer.h()).unwrap();
    fx.dom(fx.three)
        .on(
            "click",
            Handler::new(|event: &mut EventObject<NodeId>, _: &[Value]| event.prevent_default()),
        )
        .unwrap();
    fx.dom(fx.four).trigger("click");
    assert!(outer.call(0).prevented);
}

#[test]
fn non_bubbling_native_event_stays_on_target() {
    let fx = Fixture::new();
    let container = fx.dom(fx.container);
    let direct = Spy::new();
    let delegated = Spy::new();
    let inline = Spy::new();
    let stopper = Spy::with(|event| {
        event.stop_propagation();
        HandlerOutput::NONE
    });
    container.on("click", direct.h()).unwrap();
    container.on("click", (".one", delegated.h())).unwrap();
    fx.doc.set_inline(fx.one, "click", inline.h());
    fx.dom(fx.one).on("click", stopper.h()).unwrap();

    fx.doc
        .dispatch_native(fx.one, &Rc::new(NativeEvent::new("click")));
    assert_eq!(
        (direct.count(), delegated.count(), inline.count(), stopper.count()),
        (0, 0, 1, 1)
    );
}

#[test]
fn only_handlers_skips_propagation_and_defaults() {
    let fx = Fixture::new();
    let direct = Spy::new();
    let delegated = Spy::new();
    let own = Spy::new();
    let (defaults, bump) = counter();
    fx.dom(fx.container).on("click", direct.h()).unwrap();
    fx.dom(fx.container)
        .on("click", (".one", delegated.h()))
        .unwrap();
    fx.dom(fx.one).on("click", own.h()).unwrap();
    fx.doc.set_default_action(fx.one, "click", move |_| bump());

    fx.dom(fx.one).trigger_with("click", (), true);
    assert_eq!(
        (direct.count(), delegated.count(), own.count()),
        (0, 0, 1)
    );
    assert_eq!(defaults.get(), 0);

    fx.dom(fx.one).trigger("click");
    assert_eq!(defaults.get(), 1);
}

#[test]
fn triggered_default_does_not_redispatch() {
    let fx = Fixture::new();
    let spy = Spy::new();
    let div = fx.div();
    div.on("click", spy.h()).unwrap();
    let doc = Rc::downgrade(&fx.doc);
    let node = div.node();
    // The default action delivers a native click, as `element.click()` would.
    fx.doc.set_default_action(node, "click", move |_| {
        if let Some(doc) = doc.upgrade() {
            doc.dispatch_native(node, &Rc::new(NativeEvent::mouse("click")));
        }
    });
    div.trigger("click");
    assert_eq!(spy.count(), 1);
}

#[test]
fn native_events_expose_standard_and_custom_properties() {
    let fx = Fixture::new();
    fx.emitter.add_property("testProperty", |_| json!(42));
    let link = fx.dom(fx.doc.element(fx.doc.body(), "a", &[]));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    link.on(
        "click",
        Handler::new(move |event: &mut EventObject<NodeId>, _: &[Value]| {
            log.borrow_mut().push((
                event.has("detail") && event.has("cancelable") && event.has("bubbles"),
                event.get("clientX"),
                event.get("testProperty"),
            ));
        }),
    )
    .unwrap();

    let mut options = serde_json::Map::new();
    options.insert("clientX".to_string(), json!(10));
    let native = Rc::new(NativeEvent::init("click", true, true));
    link.trigger(EventObject::from_native_with(native, options));
    fx.click(link.node());

    let seen = seen.borrow();
    assert_eq!(seen[0], (true, Some(json!(10)), Some(json!(42))));
    assert_eq!(seen[1], (true, Some(json!(0)), Some(json!(42))));
}

#[test]
fn load_does_not_bubble_to_window() {
    let fx = Fixture::new();
    let image = fx.dom(fx.doc.element(fx.doc.body(), "img", &[]));
    let on_image = Spy::new();
    let on_window = Spy::new();
    image.on("load", on_image.h()).unwrap();
    fx.dom(fx.doc.window()).on("load", on_window.h()).unwrap();

    fx.doc
        .dispatch_native(image.node(), &Rc::new(NativeEvent::new("load")));
    image.trigger("load");
    assert_eq!((on_image.count(), on_window.count()), (2, 0));
}

#[test]
fn beforeunload_result_cancels_unload() {
    let fx = Fixture::new();
    let window = fx.dom(fx.doc.window());
    let before = Spy::returning_false();
    let unload = Spy::new();
    window.on("beforeunload", before.h()).unwrap();
    window.on("unload", unload.h()).unwrap();
    assert!(!fx.doc.unload());
    assert_eq!((before.count(), unload.count()), (1, 0));

    window.off("beforeunload");
    assert!(fx.doc.unload());
    assert_eq!(unload.count(), 1);
}

#[test]
fn every_hook_stage_runs() {
    let fx = Fixture::new();
    let (add, bump_add) = counter();
    let (remove, bump_remove) = counter();
    let (setup, bump_setup) = counter();
    let (teardown, bump_teardown) = counter();
    let (handle, bump_handle) = counter();
    let (trigger, bump_trigger) = counter();
    let (pre, bump_pre) = counter();
    let (post, bump_post) = counter();
    fx.emitter.hooks().register(
        "dblclick",
        Hook::new()
            .on_add(move |_, _| bump_add())
            .on_remove(move |_, _| bump_remove())
            .on_setup(move |_, _| {
                bump_setup();
                Attach::Platform
            })
            .on_teardown(move |_| {
                bump_teardown();
                Attach::Platform
            })
            .on_handle(move |_, _, _| {
                bump_handle();
                HandlerOutput::NONE
            })
            .on_trigger(move |_, _, _| {
                bump_trigger();
                Verdict::Proceed
            })
            .on_pre_dispatch(move |_, _| {
                bump_pre();
                Verdict::Proceed
            })
            .on_post_dispatch(move |_, _| bump_post()),
    );
    let div = fx.div();
    let spy = Spy::new();
    div.on("dblclick", spy.h()).unwrap();
    div.trigger("dblclick");
    div.off("dblclick");

    let counts = [&add, &remove, &setup, &teardown, &handle, &trigger, &pre, &post].map(|c| c.get());
    assert_eq!(counts, [1; 8]);
    // The handle hook replaced the handler call.
    assert_eq!(spy.count(), 0);
    assert_eq!(fx.doc.attach_count(), 1);
    assert_eq!(fx.doc.detach_count(), 1);
}

#[test]
fn setup_hook_can_take_over_wiring() {
    let fx = Fixture::new();
    fx.emitter.hooks().register(
        "custom",
        Hook::new()
            .on_setup(|_, _| Attach::Handled)
            .on_teardown(|_| Attach::Handled),
    );
    let div = fx.div();
    let spy = Spy::new();
    div.on("custom", spy.h()).unwrap();
    assert_eq!(fx.doc.attach_count(), 0);
    div.trigger("custom");
    assert_eq!(spy.count(), 1);
    div.off_all();
    assert_eq!(fx.doc.detach_count(), 0);
}

#[test]
fn pre_dispatch_veto_skips_handlers_and_post_dispatch() {
    let fx = Fixture::new();
    let (post, bump_post) = counter();
    fx.emitter.hooks().register(
        "dblclick",
        Hook::new()
            .on_pre_dispatch(|_, _| Verdict::Veto)
            .on_post_dispatch(move |_, _| bump_post()),
    );
    let div = fx.div();
    let spy = Spy::new();
    div.on("dblclick", spy.h()).unwrap();
    div.trigger("dblclick");
    assert_eq!((spy.count(), post.get()), (0, 0));
}

#[test]
fn pre_dispatch_veto_aborts_the_whole_trigger() {
    let fx = Fixture::new();
    let (pre, bump_pre) = counter();
    let calls = pre.clone();
    fx.emitter.hooks().register(
        "dblclick",
        Hook::new().on_pre_dispatch(move |_, _| {
            bump_pre();
            // Only the first pass is vetoed.
            if calls.get() == 1 {
                Verdict::Veto
            } else {
                Verdict::Proceed
            }
        }),
    );
    let div = fx.div();
    let own = Spy::new();
    let ancestor = Spy::new();
    let inline = Spy::new();
    let (defaults, bump) = counter();
    div.on("dblclick", own.h()).unwrap();
    fx.dom(fx.doc.body()).on("dblclick", ancestor.h()).unwrap();
    fx.doc.set_inline(div.node(), "dblclick", inline.h());
    fx.doc.set_default_action(div.node(), "dblclick", move |_| bump());

    assert_eq!(div.trigger("dblclick"), None);
    assert_eq!(pre.get(), 1);
    assert_eq!(
        (own.count(), ancestor.count(), inline.count(), defaults.get()),
        (0, 0, 0, 0)
    );

    // Later triggers pass the gate and run everything.
    div.trigger("dblclick");
    assert_eq!(pre.get(), 3);
    assert_eq!(
        (own.count(), ancestor.count(), inline.count(), defaults.get()),
        (1, 1, 1, 1)
    );
}

#[test]
fn trigger_veto_skips_everything() {
    let fx = Fixture::new();
    fx.emitter
        .hooks()
        .register("dblclick", Hook::new().on_trigger(|_, _, _| Verdict::Veto));
    let div = fx.div();
    let spy = Spy::new();
    div.on("dblclick", spy.h()).unwrap();
    assert_eq!(div.trigger("dblclick"), None);
    assert_eq!(spy.count(), 0);

    // Only-handler triggers bypass the gate.
    div.trigger_with("dblclick", (), true);
    assert_eq!(spy.count(), 1);
    assert_eq!(spy.call(0).trigger, Some(TriggerMode::OnlyHandlers));
    assert_eq!(spy.call(0).entry.as_deref(), Some("dblclick"));
}

#[test]
fn prevent_default_veto_keeps_default_action() {
    let fx = Fixture::new();
    fx.emitter
        .hooks()
        .register("click", Hook::new().on_prevent_default(|_| Verdict::Veto));
    let div = fx.div();
    let (defaults, bump) = counter();
    let inline = Spy::new();
    let preventer = Spy::with(|event| {
        event.prevent_default();
        HandlerOutput::NONE
    });
    fx.doc.set_default_action(div.node(), "click", move |_| bump());
    fx.doc.set_inline(div.node(), "click", inline.h());
    div.on("click", preventer.h()).unwrap();
    div.trigger("click");
    assert_eq!((defaults.get(), inline.count(), preventer.count()), (1, 1, 1));
}

#[test]
fn focus_trigger_moves_focus_through_the_host() {
    let fx = Fixture::new();
    let button = fx.doc.element(fx.container, "button", &[]);
    let direct = Spy::new();
    let delegated = Spy::new();
    let blurred = Spy::new();
    fx.dom(button).on("focus", direct.h()).unwrap();
    fx.dom(button).on("blur", blurred.h()).unwrap();
    fx.dom(fx.container)
        .on("focus", ("button", delegated.h()))
        .unwrap();
    assert_eq!(fx.emitter.bound_types(fx.container), ["focusin"]);

    fx.dom(button).trigger("focus");
    assert_eq!(fx.doc.active_element(), Some(button));
    assert_eq!((direct.count(), delegated.count()), (1, 1));

    // Already focused: handlers run without a second focus move.
    fx.dom(button).trigger("focus");
    assert_eq!(direct.count(), 2);

    fx.dom(button).trigger("blur");
    assert_eq!(fx.doc.active_element(), None);
    assert_eq!(blurred.count(), 1);
}

#[test]
fn mouseenter_is_emulated_with_mouseover() {
    let fx = Fixture::new();
    let spy = Spy::new();
    fx.dom(fx.three).on("mouseenter", spy.h()).unwrap();
    assert_eq!(fx.emitter.bound_types(fx.three), ["mouseover"]);

    let over = |target: NodeId, from: NodeId| {
        fx.doc.dispatch_native(
            target,
            &Rc::new(NativeEvent::mouse("mouseover").with_related_target(from)),
        );
    };
    // Entering from outside.
    over(fx.four, fx.one);
    assert_eq!(spy.count(), 1);
    assert_eq!(spy.call(0).ty, "mouseenter");
    // Moving within the element.
    over(fx.three, fx.four);
    over(fx.four, fx.three);
    assert_eq!(spy.count(), 1);

    fx.dom(fx.three).off(("mouseenter", spy.h()));
    assert!(!fx.emitter.has_bindings(fx.three));
}

#[test]
fn delegation_skips_disabled_elements_for_click() {
    let fx = Fixture::new();
    let button = fx.doc.element(fx.container, "button", &[]);
    fx.doc.set_disabled(button, true);
    let clicked = Spy::new();
    let pressed = Spy::new();
    let own = Spy::new();
    fx.dom(fx.container).on("click", ("button", clicked.h())).unwrap();
    fx.dom(fx.container)
        .on("mousedown", ("button", pressed.h()))
        .unwrap();
    fx.dom(button).on("click", own.h()).unwrap();
    fx.dom(button).trigger("click");
    fx.dom(button).trigger("mousedown");
    assert_eq!((clicked.count(), pressed.count(), own.count()), (0, 1, 1));
}

#[test]
fn secondary_button_clicks_skip_delegation() {
    let fx = Fixture::new();
    let delegated = Spy::new();
    let direct = Spy::new();
    fx.dom(fx.container).on("click", (".one", delegated.h())).unwrap();
    fx.dom(fx.container).on("click", direct.h()).unwrap();
    fx.doc.dispatch_native(
        fx.one,
        &Rc::new(NativeEvent::mouse("click").with_prop("button", 2)),
    );
    assert_eq!((delegated.count(), direct.count()), (0, 1));
    fx.click(fx.one);
    assert_eq!((delegated.count(), direct.count()), (1, 2));
}

#[test]
fn handlers_can_unbind_during_dispatch() {
    let fx = Fixture::new();
    let div = fx.div();
    let later = Spy::new();
    let emitter = Rc::downgrade(&fx.emitter);
    let node = div.node();
    let later_handler = later.h();
    div.on(
        "click",
        Handler::new(move |_: &mut EventObject<NodeId>, _: &[Value]| {
            if let Some(emitter) = emitter.upgrade() {
                emitter.off(node, Unbind::types("click").with_handler(later_handler.clone()));
            }
        }),
    )
    .unwrap();
    div.on("click", later.h()).unwrap();
    // The running dispatch keeps its snapshot.
    div.trigger("click");
    assert_eq!(later.count(), 1);
    div.trigger("click");
    assert_eq!(later.count(), 1);
}

#[test]
fn dropping_the_emitter_silences_listeners() {
    let fx = Fixture::new();
    let div = fx.div();
    let spy = Spy::new();
    div.on("click", spy.h()).unwrap();
    let node = div.node();
    let Fixture { doc, emitter, .. } = fx;
    drop(div);
    drop(emitter);
    assert!(doc.has_listener(node, "click"));
    doc.dispatch_native(node, &Rc::new(NativeEvent::mouse("click")));
    assert_eq!(spy.count(), 0);
}
