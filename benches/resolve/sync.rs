#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, Criterion};
use depot::{registry, InstantiateErrorKind, Registry};
use std::sync::Arc;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("sync_get_single", |b| {
        struct A;

        let registry = registry! {
            provide(|| Ok::<_, InstantiateErrorKind>(A)),
        };
        b.iter(|| registry.get::<A>().unwrap());
    })
    .bench_function("sync_get_named", |b| {
        struct A;

        let registry = registry! {
            provide(|| Ok::<_, InstantiateErrorKind>(A), name = "a"),
            provide(|| Ok::<_, InstantiateErrorKind>(A), name = "b"),
        };
        b.iter(|| registry.get_named::<A>("b").unwrap());
    })
    .bench_function("sync_get_transient_single", |b| {
        struct A;

        let registry = registry! {
            provide(|| Ok::<_, InstantiateErrorKind>(A)),
        };
        b.iter(|| registry.get_transient::<A>().unwrap());
    })
    .bench_function("sync_get_transient_many", |b| {
        struct A(Arc<B>, Arc<C>);
        struct B(i32);
        struct C(Arc<CA>);
        struct CA;

        let registry = registry! {
            provide(|| Ok::<_, InstantiateErrorKind>(CA)),
            provide(|| Ok::<_, InstantiateErrorKind>(B(2))),
            provide(|registry: Registry| {
                let ca = registry.get::<CA>().map_err(anyhow::Error::from)?;
                Ok::<_, InstantiateErrorKind>(C(ca))
            }),
            provide(|registry: Registry| {
                let b = registry.get::<B>().map_err(anyhow::Error::from)?;
                let c = registry.get::<C>().map_err(anyhow::Error::from)?;
                Ok::<_, InstantiateErrorKind>(A(b, c))
            }),
        };
        b.iter(|| registry.get_transient::<A>().unwrap());
    })
    .bench_function("sync_get_remove", |b| {
        struct A;

        let registry = registry! {
            provide(|| Ok::<_, InstantiateErrorKind>(A), finalizer = |_: Arc<A>| {}),
        };
        b.iter(|| {
            registry.get::<A>().unwrap();
            registry.remove::<A>().unwrap()
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
