/// Builds a [`Registry`](crate::Registry) from a list of entries.
///
/// Entries:
/// - `provide(instantiator, options...)` registers a sync instantiator.
/// - `provide_async(instantiator, options...)` registers an async instantiator (requires the `async` feature).
/// - `instance(value, options...)` registers an instance created outside the registry.
///
/// Options, in any order: `name = ..`, `finalizer = ..`, `async_finalizer = ..` (requires the `async` feature).
///
/// # Examples
/// ```
/// use depot::{registry, InstantiateErrorKind};
/// use std::sync::Arc;
///
/// struct Pool(u8);
///
/// let registry = registry! {
///     provide(|| Ok::<_, InstantiateErrorKind>(Pool(1))),
///     provide(|| Ok::<_, InstantiateErrorKind>(Pool(2)), name = "replica", finalizer = |_: Arc<Pool>| {}),
///     instance(String::from("postgres://localhost")),
/// };
///
/// assert_eq!(registry.get::<Pool>().unwrap().0, 1);
/// assert_eq!(registry.get_named::<Pool>("replica").unwrap().0, 2);
/// assert!(registry.is_ready::<String>());
/// ```
#[macro_export]
macro_rules! registry {
    (
        $(
            $kind:ident ( $inst:expr $(, $option:ident = $value:expr )* $(,)? )
        ),* $(,)?
    ) => {{
        let registry = $crate::Registry::new();
        $(
            registry.register(
                $crate::registry_internal! { @options $crate::registry_internal! { @provider $kind, $inst } $(, $option = $value )* }
            );
        )*
        registry
    }};
}

#[macro_export]
#[doc(hidden)]
macro_rules! registry_internal {
    // === Providers ===
    // Example: registry_internal! { @provider provide, inst_a }
    (@provider provide, $inst:expr) => {
        $crate::Provider::new($inst)
    };
    (@provider provide_async, $inst:expr) => {
        $crate::Provider::new_async($inst)
    };
    (@provider instance, $value:expr) => {
        $crate::Provider::from_instance($value)
    };

    // === Options ===
    // Example: registry_internal! { @options provider, name = "a", finalizer = fin_a }
    (@options $provider:expr) => {
        $provider
    };
    (@options $provider:expr, name = $name:expr $(, $option:ident = $value:expr )*) => {
        $crate::registry_internal! { @options $provider.with_name($name) $(, $option = $value )* }
    };
    (@options $provider:expr, finalizer = $fin:expr $(, $option:ident = $value:expr )*) => {
        $crate::registry_internal! { @options $provider.with_finalizer($fin) $(, $option = $value )* }
    };
    (@options $provider:expr, async_finalizer = $fin:expr $(, $option:ident = $value:expr )*) => {
        $crate::registry_internal! { @options $provider.with_async_finalizer($fin) $(, $option = $value )* }
    };
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    use crate::InstantiateErrorKind;

    #[derive(Clone)]
    struct Pool(u8);

    fn inst_a() -> Result<Pool, InstantiateErrorKind> {
        Ok(Pool(1))
    }

    fn inst_b() -> Result<Pool, InstantiateErrorKind> {
        Ok(Pool(2))
    }

    #[test]
    #[traced_test]
    fn test_empty() {
        let registry = registry! {};

        assert!(registry.is_empty());
    }

    #[test]
    #[traced_test]
    fn test_entries() {
        let registry = registry! {
            provide(inst_a),
            provide(inst_b, name = "b"),
        };

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get::<Pool>().unwrap().0, 1);
        assert_eq!(registry.get_named::<Pool>("b").unwrap().0, 2);
    }

    #[test]
    #[traced_test]
    fn test_entry_with_finalizer_and_name_swapped() {
        static FINALIZED: AtomicU8 = AtomicU8::new(0);

        let registry = registry! {
            provide(inst_a, finalizer = |_: Arc<Pool>| {
                FINALIZED.fetch_add(1, Ordering::SeqCst);
            }, name = "a"),
        };

        let _ = registry.get_named::<Pool>("a").unwrap();
        registry.clear().unwrap();

        assert_eq!(FINALIZED.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_instance() {
        let registry = registry! {
            instance(Pool(3), name = "cached"),
        };

        assert!(registry.is_ready_named::<Pool>("cached"));
        assert_eq!(registry.get_named::<Pool>("cached").unwrap().0, 3);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    #[traced_test]
    async fn test_async_entry() {
        static FINALIZED: AtomicU8 = AtomicU8::new(0);

        let registry = registry! {
            provide_async(|| async { Ok::<_, InstantiateErrorKind>(Pool(4)) }, async_finalizer = |_: Arc<Pool>| async {
                FINALIZED.fetch_add(1, Ordering::SeqCst);
            }),
        };

        assert_eq!(registry.get_async::<Pool>().await.unwrap().0, 4);
        registry.clear_async().await.unwrap();

        assert_eq!(FINALIZED.load(Ordering::SeqCst), 1);
    }
}
