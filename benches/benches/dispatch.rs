// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_emitter`: binding churn, triggers and native
//! delivery through delegated handlers.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::cell::Cell;
use std::rc::Rc;

use understory_emitter::adapters::memory::{MemoryDocument, NodeId};
use understory_emitter::{Binding, Emitter, EventObject, Handler, NativeEvent, Unbind, Value};

/// A chain of `depth` nested `div`s under `body`; returns the deepest one.
fn nested(doc: &MemoryDocument, depth: usize) -> NodeId {
    let mut node = doc.body();
    for level in 0..depth {
        let class = if level % 2 == 0 { "even" } else { "odd" };
        node = doc.element(node, "div", &[class]);
    }
    node
}

fn counting_handler(hits: &Rc<Cell<u64>>) -> Handler<NodeId> {
    let hits = hits.clone();
    Handler::new(move |_: &mut EventObject<NodeId>, _: &[Value]| hits.set(hits.get() + 1))
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter/bind");
    group.bench_function("on_off_direct", |b| {
        let doc = Rc::new(MemoryDocument::new());
        let emitter = Emitter::<NodeId>::new(doc.clone());
        let node = nested(&doc, 1);
        let handler = counting_handler(&Rc::new(Cell::new(0)));
        b.iter(|| {
            emitter
                .on(node, Binding::new("click.bench", handler.clone()))
                .unwrap();
            emitter.off(node, Unbind::types(".bench"));
        });
    });
    group.bench_function("on_delegated_x16_then_off_all", |b| {
        b.iter_batched(
            || {
                let doc = Rc::new(MemoryDocument::new());
                let emitter = Emitter::<NodeId>::new(doc.clone());
                let node = nested(&doc, 1);
                (doc, emitter, node)
            },
            |(doc, emitter, node)| {
                let handler = counting_handler(&Rc::new(Cell::new(0)));
                for _ in 0..16 {
                    emitter
                        .on(
                            node,
                            Binding::new("click", handler.clone()).with_selector("div.even"),
                        )
                        .unwrap();
                }
                emitter.off_all(node);
                black_box(doc.detach_count());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();

    let mut group = c.benchmark_group("emitter/trigger");
    for depth in [4_usize, 16, 64] {
        let doc = Rc::new(MemoryDocument::new());
        let emitter = Emitter::<NodeId>::new(doc.clone());
        let leaf = nested(&doc, depth);
        let hits = Rc::new(Cell::new(0));
        emitter
            .on(doc.body(), Binding::new("click", counting_handler(&hits)))
            .unwrap();
        group.bench_function(BenchmarkId::new("bubble_to_body", depth), |b| {
            b.iter(|| black_box(emitter.trigger(leaf, "click", (), false)));
        });
        group.bench_function(BenchmarkId::new("only_handlers", depth), |b| {
            b.iter(|| black_box(emitter.trigger(leaf, "click", (), true)));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("emitter/native");
    for depth in [4_usize, 16, 64] {
        let doc = Rc::new(MemoryDocument::new());
        let emitter = Emitter::<NodeId>::new(doc.clone());
        let leaf = nested(&doc, depth);
        let hits = Rc::new(Cell::new(0));
        emitter
            .on(
                doc.body(),
                Binding::new("click", counting_handler(&hits)).with_selector("div.even"),
            )
            .unwrap();
        group.bench_function(BenchmarkId::new("delegated_click", depth), |b| {
            b.iter(|| {
                let native = Rc::new(NativeEvent::mouse("click"));
                black_box(doc.dispatch_native(leaf, &native))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
