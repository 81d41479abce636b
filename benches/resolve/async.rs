#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, Criterion};
use depot::{registry, InstantiateErrorKind};
use tokio::runtime::Builder;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("async_get_single", |b| {
        struct A;

        let registry = registry! {
            provide_async(|| async { Ok::<_, InstantiateErrorKind>(A) }),
        };
        b.to_async(Builder::new_current_thread().build().unwrap()).iter(|| {
            let registry = registry.clone();
            async move { registry.get_async::<A>().await.unwrap() }
        });
    })
    .bench_function("async_get_sync_instantiator", |b| {
        struct A;

        let registry = registry! {
            provide(|| Ok::<_, InstantiateErrorKind>(A)),
        };
        b.to_async(Builder::new_current_thread().build().unwrap()).iter(|| {
            let registry = registry.clone();
            async move { registry.get_async::<A>().await.unwrap() }
        });
    })
    .bench_function("async_get_transient_single", |b| {
        struct A;

        let registry = registry! {
            provide_async(|| async { Ok::<_, InstantiateErrorKind>(A) }),
        };
        b.to_async(Builder::new_current_thread().build().unwrap()).iter(|| {
            let registry = registry.clone();
            async move { registry.get_transient_async::<A>().await.unwrap() }
        });
    })
    .bench_function("async_get_remove", |b| {
        struct A;

        let registry = registry! {
            provide_async(|| async { Ok::<_, InstantiateErrorKind>(A) }),
        };
        b.to_async(Builder::new_current_thread().build().unwrap()).iter(|| {
            let registry = registry.clone();
            async move {
                registry.get_async::<A>().await.unwrap();
                registry.remove_async::<A>().await.unwrap()
            }
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
