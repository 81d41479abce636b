use alloc::sync::Arc;
use core::marker::PhantomData;

use crate::{
    any::RcAny,
    errors::InstantiateErrorKind,
    finalizer::{boxed_finalizer, BoxedFinalizer, Finalizer},
    instantiator::{boxed_instantiator, instance, BoxedInstantiator, FromRegistry, Instantiator},
    key::{Key, Name},
    Dispose,
};

/// Registration of a dependency: its instantiator with the options it's registered with.
///
/// Passed to [`Registry::register`](crate::Registry::register).
/// Shorthands like [`Registry::provide`](crate::Registry::provide) build it with the default options.
///
/// # Examples
/// ```
/// use depot::{InstantiateErrorKind, Provider, Registry};
/// use std::sync::Arc;
///
/// struct Connection(u16);
///
/// let registry = Registry::new();
/// registry.register(
///     Provider::new(|| Ok::<_, InstantiateErrorKind>(Connection(5432)))
///         .with_name("primary")
///         .with_finalizer(|_: Arc<Connection>| {}),
/// );
///
/// assert!(registry.is_registered_named::<Connection>("primary"));
/// assert!(!registry.is_registered::<Connection>());
/// ```
pub struct Provider<Dep> {
    pub(crate) name: Option<Name>,
    pub(crate) instantiator: BoxedInstantiator,
    pub(crate) finalizer: Option<BoxedFinalizer>,
    /// Instance that is cached on registration
    pub(crate) instance: Option<RcAny>,
    _marker: PhantomData<fn() -> Dep>,
}

impl<Dep> Provider<Dep>
where
    Dep: Send + 'static,
{
    #[inline]
    #[must_use]
    pub fn new<Inst, Deps>(instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps, Provides = Dep, Error = InstantiateErrorKind> + Send + Sync,
        Deps: FromRegistry + 'static,
    {
        Self::with_instantiator(BoxedInstantiator::Sync(boxed_instantiator(instantiator)))
    }

    /// Registration of an async instantiator.
    ///
    /// # Warning
    /// Its instances can be resolved synchronously only after they were resolved with an async method,
    /// see [`Registry::get`](crate::Registry::get).
    #[cfg(feature = "async")]
    #[inline]
    #[must_use]
    pub fn new_async<Inst, Deps>(instantiator: Inst) -> Self
    where
        Inst: crate::async_impl::Instantiator<Deps, Provides = Dep, Error = InstantiateErrorKind> + Send + Sync,
        Deps: FromRegistry + Send + 'static,
    {
        Self::with_instantiator(BoxedInstantiator::Async(crate::async_impl::instantiator::boxed_instantiator(instantiator)))
    }

    #[inline]
    #[must_use]
    fn with_instantiator(instantiator: BoxedInstantiator) -> Self {
        Self {
            name: None,
            instantiator,
            finalizer: None,
            instance: None,
            _marker: PhantomData,
        }
    }
}

impl<Dep: 'static> Provider<Dep> {
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Name>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Key the dependency is registered under
    #[inline]
    #[must_use]
    pub fn key(&self) -> Key {
        Key::new::<Dep>(self.name.clone())
    }
}

impl<Dep> Provider<Dep>
where
    Dep: Clone + Send + Sync + 'static,
{
    /// Registration of an instance created outside the registry.
    /// The instance is cached on registration, while transient resolutions get its clones.
    #[inline]
    #[must_use]
    pub fn from_instance(val: Dep) -> Self {
        let mut provider = Self::new(instance(val.clone()));
        provider.instance = Some(Arc::new(val));
        provider
    }
}

impl<Dep> Provider<Dep>
where
    Dep: Send + Sync + 'static,
{
    /// Sets a finalizer, called with the cached instance when it's removed from the registry.
    ///
    /// # Warning
    /// The finalizer is called only for instances that were actually resolved, transient ones aren't finalized.
    #[inline]
    #[must_use]
    pub fn with_finalizer(mut self, finalizer: impl Finalizer<Dep> + Send + Sync) -> Self {
        self.finalizer = Some(BoxedFinalizer::Sync(boxed_finalizer(finalizer)));
        self
    }

    /// Sets an async finalizer.
    /// Instances with it can be removed only with async methods, like [`Registry::remove_async`](crate::Registry::remove_async).
    #[cfg(feature = "async")]
    #[inline]
    #[must_use]
    pub fn with_async_finalizer(mut self, finalizer: impl crate::async_impl::Finalizer<Dep> + Send + Sync) -> Self {
        self.finalizer = Some(BoxedFinalizer::Async(crate::async_impl::finalizer::boxed_finalizer(finalizer)));
        self
    }

    /// Sets [`Dispose::dispose`] as the finalizer
    #[inline]
    #[must_use]
    pub fn with_dispose(self) -> Self
    where
        Dep: Dispose,
    {
        self.with_finalizer(|dependency: Arc<Dep>| dependency.dispose())
    }

    /// Sets [`crate::async_impl::Dispose::dispose`] as the async finalizer
    #[cfg(feature = "async")]
    #[inline]
    #[must_use]
    pub fn with_async_dispose(self) -> Self
    where
        Dep: crate::async_impl::Dispose,
    {
        self.with_async_finalizer(|dependency: Arc<Dep>| async move { dependency.dispose().await })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU8, Ordering};

    use super::Provider;
    use crate::{Dispose, InstantiateErrorKind, Key, Registry};

    struct Connection;

    static DISPOSED: AtomicU8 = AtomicU8::new(0);

    impl Dispose for Connection {
        fn dispose(&self) {
            DISPOSED.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_key() {
        let provider = Provider::new(|| Ok::<_, InstantiateErrorKind>(Connection));
        assert_eq!(provider.key(), Key::of::<Connection>());

        let provider = provider.with_name("replica");
        assert_eq!(provider.key(), Key::named::<Connection>("replica"));
    }

    #[test]
    fn test_from_instance_cached() {
        let provider = Provider::from_instance(1u8);
        let cached = provider.instance.clone().unwrap();

        assert_eq!(cached.downcast_ref::<u8>(), Some(&1));
    }

    #[test]
    fn test_with_dispose() {
        let registry = Registry::new();
        registry.register(Provider::new(|| Ok::<_, InstantiateErrorKind>(Connection)).with_dispose());

        let _ = registry.get::<Connection>().unwrap();
        let removed = registry.remove::<Connection>().unwrap();

        assert!(removed.is_some());
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_with_async_dispose() {
        static ASYNC_DISPOSED: AtomicU8 = AtomicU8::new(0);

        struct Pool;

        impl crate::async_impl::Dispose for Pool {
            async fn dispose(&self) {
                tokio::task::yield_now().await;
                ASYNC_DISPOSED.fetch_add(1, Ordering::SeqCst);
            }
        }

        let registry = Registry::new();
        registry.register(Provider::new(|| Ok::<_, InstantiateErrorKind>(Pool)).with_async_dispose());

        let pool: Arc<Pool> = registry.get().unwrap();
        drop(pool);

        assert!(registry.remove::<Pool>().is_err());
        assert!(registry.remove_async::<Pool>().await.unwrap().is_some());
        assert_eq!(ASYNC_DISPOSED.load(Ordering::SeqCst), 1);
    }
}
