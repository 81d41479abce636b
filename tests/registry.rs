use std::sync::{
    atomic::{AtomicU32, AtomicU8, Ordering},
    Arc,
};

use depot::{FinalizeErrorKind, InstantiateErrorKind, Key, Provider, Registry, ResolveErrorKind};
use parking_lot::Mutex;
use tracing_test::traced_test;

struct Counter {
    value: AtomicU32,
}

impl Counter {
    fn new() -> Self {
        Self { value: AtomicU32::new(0) }
    }

    fn increment(&self) -> u32 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Endpoint(&'static str);

#[test]
#[traced_test]
fn test_singleton_identity() {
    let registry = Registry::new();
    registry.provide(|| Ok::<_, InstantiateErrorKind>(Counter::new()));

    let first = registry.get::<Counter>().unwrap();
    let second = registry.get::<Counter>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.increment(), 1);
    assert_eq!(second.increment(), 2);
}

#[test]
#[traced_test]
fn test_transient_freshness() {
    let registry = Registry::new();
    registry.provide(|| Ok::<_, InstantiateErrorKind>(Counter::new()));

    let first = registry.get_transient::<Counter>().unwrap();
    let second = registry.get_transient::<Counter>().unwrap();

    assert_eq!(first.increment(), 1);
    assert_eq!(second.increment(), 1);
    assert!(!registry.is_ready::<Counter>());
}

#[test]
#[traced_test]
fn test_named_independence() {
    let registry = Registry::new();
    registry
        .provide_named("a", || Ok::<_, InstantiateErrorKind>(Endpoint("a")))
        .provide_named("b", || Ok::<_, InstantiateErrorKind>(Endpoint("b")));

    let a = registry.get_named::<Endpoint>("a").unwrap();
    let b = registry.get_named::<Endpoint>("b").unwrap();

    assert_eq!(*a, Endpoint("a"));
    assert_eq!(*b, Endpoint("b"));
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!registry.is_registered::<Endpoint>());
}

#[test]
#[traced_test]
fn test_finalizer_only_for_materialized() {
    let finalized = Arc::new(Mutex::new(Vec::new()));

    let registry = Registry::new();
    registry.register(Provider::new(|| Ok::<_, InstantiateErrorKind>(Endpoint("db"))).with_finalizer({
        let finalized = finalized.clone();
        move |endpoint: Arc<Endpoint>| finalized.lock().push(endpoint)
    }));

    assert!(registry.remove::<Endpoint>().unwrap().is_none());
    assert!(finalized.lock().is_empty());

    let endpoint = registry.get::<Endpoint>().unwrap();
    registry.remove::<Endpoint>().unwrap();

    let finalized = finalized.lock();
    assert_eq!(finalized.len(), 1);
    assert!(Arc::ptr_eq(&finalized[0], &endpoint));
}

#[test]
#[traced_test]
fn test_clear_total_reset() {
    let finalized = Arc::new(AtomicU8::new(0));

    let registry = Registry::new();
    for name in ["a", "b", "c"] {
        registry.register(
            Provider::new(|| Ok::<_, InstantiateErrorKind>(Counter::new()))
                .with_name(name)
                .with_finalizer({
                    let finalized = finalized.clone();
                    move |_: Arc<Counter>| {
                        finalized.fetch_add(1, Ordering::SeqCst);
                    }
                }),
        );
        registry.get_named::<Counter>(name).unwrap();
    }

    registry.clear().unwrap();

    assert_eq!(finalized.load(Ordering::SeqCst), 3);
    for name in ["a", "b", "c"] {
        assert!(!registry.is_registered_named::<Counter>(name));
        assert!(!registry.is_ready_named::<Counter>(name));
    }
    assert!(registry.is_empty());

    registry.provide(|| Ok::<_, InstantiateErrorKind>(Counter::new()));
    assert_eq!(registry.get::<Counter>().unwrap().increment(), 1);
}

#[test]
#[traced_test]
fn test_not_registered() {
    let registry = Registry::new();

    let err = registry.get_named::<Endpoint>("primary").unwrap_err();
    assert!(matches!(err, ResolveErrorKind::NoInstantiator { .. }));
    assert_eq!(err.key(), Some(&Key::named::<Endpoint>("primary")));

    let message = err.to_string();
    assert!(message.contains("Endpoint"));
    assert!(message.contains("primary"));

    let err = registry.get_transient::<Endpoint>().unwrap_err();
    assert_eq!(err.key(), Some(&Key::of::<Endpoint>()));
}

#[test]
#[traced_test]
fn test_remove_scoping() {
    let registry = Registry::new();
    registry
        .provide(|| Ok::<_, InstantiateErrorKind>(Endpoint("default")))
        .provide_named("a", || Ok::<_, InstantiateErrorKind>(Endpoint("a")));

    let default = registry.get::<Endpoint>().unwrap();
    let _ = registry.get_named::<Endpoint>("a").unwrap();

    registry.remove_named::<Endpoint>("a").unwrap();

    assert!(!registry.is_ready_named::<Endpoint>("a"));
    assert!(Arc::ptr_eq(&default, &registry.get::<Endpoint>().unwrap()));

    let a = registry.get_named::<Endpoint>("a").unwrap();
    registry.remove::<Endpoint>().unwrap();

    assert!(!registry.is_ready::<Endpoint>());
    assert!(Arc::ptr_eq(&a, &registry.get_named::<Endpoint>("a").unwrap()));
}

#[test]
#[traced_test]
fn test_counter_scenario() {
    let disposed = Arc::new(Mutex::new(Vec::new()));

    let registry = Registry::new();
    registry.register(Provider::new(|| Ok::<_, InstantiateErrorKind>(Counter::new())).with_finalizer({
        let disposed = disposed.clone();
        move |_: Arc<Counter>| disposed.lock().push("disposed")
    }));

    let first = registry.get::<Counter>().unwrap();
    let second = registry.get::<Counter>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.increment(), 1);

    let removed = registry.remove::<Counter>().unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &removed));
    assert_eq!(*disposed.lock(), ["disposed"]);

    let third = registry.get::<Counter>().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.increment(), 1);
    assert_eq!(disposed.lock().len(), 1);
}

#[test]
#[traced_test]
fn test_finalizer_captured_on_build() {
    let finalized = Arc::new(Mutex::new(Vec::new()));

    let registry = Registry::new();
    registry.register(Provider::new(|| Ok::<_, InstantiateErrorKind>(Endpoint("old"))).with_finalizer({
        let finalized = finalized.clone();
        move |_: Arc<Endpoint>| finalized.lock().push("old")
    }));
    let _ = registry.get::<Endpoint>().unwrap();

    registry.register(Provider::new(|| Ok::<_, InstantiateErrorKind>(Endpoint("new"))).with_finalizer({
        let finalized = finalized.clone();
        move |_: Arc<Endpoint>| finalized.lock().push("new")
    }));

    assert_eq!(*registry.remove::<Endpoint>().unwrap().unwrap(), Endpoint("old"));
    assert_eq!(*registry.get::<Endpoint>().unwrap(), Endpoint("new"));
    registry.remove::<Endpoint>().unwrap();

    assert_eq!(*finalized.lock(), ["old", "new"]);
}

#[test]
#[traced_test]
fn test_producer_error_passed_through() {
    #[derive(Debug, thiserror::Error)]
    #[error("port {0} is in use")]
    struct PortInUse(u16);

    let registry = Registry::new();
    registry.provide(|| Err::<Endpoint, _>(InstantiateErrorKind::from(anyhow::Error::new(PortInUse(8080)))));

    let ResolveErrorKind::Instantiate(err) = registry.get::<Endpoint>().unwrap_err() else {
        panic!("instantiation error expected");
    };
    let InstantiateErrorKind::Custom(err) = &*err;

    assert_eq!(err.downcast_ref::<PortInUse>().map(|err| err.0), Some(8080));
}

#[test]
#[traced_test]
fn test_remove_requires_async_finalizer() {
    let registry = Registry::new();
    registry.register(Provider::new(|| Ok::<_, InstantiateErrorKind>(Endpoint("db"))).with_async_finalizer(|_: Arc<Endpoint>| async {}));

    let _ = registry.get::<Endpoint>().unwrap();

    assert!(matches!(registry.remove::<Endpoint>(), Err(FinalizeErrorKind::RequiresAsync { .. })));
    assert!(registry.is_ready::<Endpoint>());
}

#[tokio::test]
#[traced_test]
async fn test_async_dedup() {
    let instantiated = Arc::new(AtomicU8::new(0));

    let registry = Registry::new();
    registry.provide_async({
        let instantiated = instantiated.clone();
        move || {
            let instantiated = instantiated.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                instantiated.fetch_add(1, Ordering::SeqCst);
                Ok::<_, InstantiateErrorKind>(Counter::new())
            }
        }
    });

    let first = tokio::spawn({
        let registry = registry.clone();
        async move { registry.get_async::<Counter>().await }
    });
    let second = tokio::spawn({
        let registry = registry.clone();
        async move { registry.get_async::<Counter>().await }
    });

    let (first, second) = (first.await.unwrap().unwrap(), second.await.unwrap().unwrap());

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(instantiated.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[traced_test]
async fn test_async_dedup_multi_thread() {
    let instantiated = Arc::new(AtomicU8::new(0));

    let registry = Registry::new();
    registry.provide_async({
        let instantiated = instantiated.clone();
        move || {
            let instantiated = instantiated.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                instantiated.fetch_add(1, Ordering::SeqCst);
                Ok::<_, InstantiateErrorKind>(Counter::new())
            }
        }
    });

    let handles = (0..8)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_async::<Counter>().await })
        })
        .collect::<Vec<_>>();

    let mut counters = Vec::with_capacity(handles.len());
    for handle in handles {
        counters.push(handle.await.unwrap().unwrap());
    }

    assert!(counters.iter().all(|counter| Arc::ptr_eq(counter, &counters[0])));
    assert_eq!(instantiated.load(Ordering::SeqCst), 1);
}
