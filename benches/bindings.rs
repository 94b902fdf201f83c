//! Benchmarks for spark-rx
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_rx::{
    bindings, install, lifecycle_scope, use_observable, App, BindingSet, DisposableAggregate,
    Observable, RxOptions, Subject, Subscription,
};

fn app() -> App {
    let mut app = App::new();
    install(&mut app);
    app
}

// =============================================================================
// SUBJECT BENCHMARKS
// =============================================================================

fn bench_subject_next(c: &mut Criterion) {
    let mut group = c.benchmark_group("subject_next");
    for subscribers in [1usize, 10, 100] {
        let subject = Subject::<u64>::new();
        let _subs: Vec<_> = (0..subscribers)
            .map(|_| subject.subscribe_next(|v| {
                black_box(v);
            }))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| subject.next(black_box(7)))
        });
    }
    group.finish();
}

fn bench_operator_chain(c: &mut Criterion) {
    let subject = Subject::<u64>::new();
    let _sub = subject
        .as_stream()
        .map(|v| v * 2)
        .filter(|v| v % 3 != 0)
        .scan(0u64, |acc, v| acc.wrapping_add(v))
        .subscribe_next(|v| {
            black_box(v);
        });
    c.bench_function("operator_chain_next", |b| b.iter(|| subject.next(black_box(5))));
}

// =============================================================================
// BINDING BENCHMARKS
// =============================================================================

fn bench_bound_property_write(c: &mut Criterion) {
    let app = app();
    let source = Subject::<u64>::new();
    let instance = app.create_instance("Bench", &RxOptions::new().subscriptions(bindings! { "v" => source.clone() }));
    app.mount(&instance, || Ok(()));

    c.bench_function("bound_property_write", |b| b.iter(|| source.next(black_box(1))));
}

fn bench_instance_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("instance_create_unmount");
    for count in [1usize, 10, 50] {
        let app = app();
        let source = Subject::<u64>::new();
        let mut set = BindingSet::new();
        for i in 0..count {
            set = set.stream(format!("b{i}"), source.clone());
        }
        let options = RxOptions::new().subscriptions(set);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let instance = app.create_instance("Bench", &options);
                app.unmount(&instance);
            })
        });
    }
    group.finish();
}

fn bench_use_observable(c: &mut Criterion) {
    let source = Subject::<u64>::new();
    let scope = lifecycle_scope(false);
    let cell = scope.run(|| use_observable(&source, None)).unwrap();

    c.bench_function("use_observable_next", |b| {
        b.iter(|| {
            source.next(black_box(3));
            black_box(cell.get())
        })
    });
}

fn bench_aggregate_dispose(c: &mut Criterion) {
    c.bench_function("aggregate_dispose_100", |b| {
        b.iter(|| {
            let aggregate = DisposableAggregate::new();
            for _ in 0..100 {
                aggregate.add(Subscription::from_fn(|| {}));
            }
            aggregate.dispose_all();
        })
    });
}

criterion_group!(
    benches,
    bench_subject_next,
    bench_operator_chain,
    bench_bound_property_write,
    bench_instance_lifecycle,
    bench_use_observable,
    bench_aggregate_dispose,
);
criterion_main!(benches);
