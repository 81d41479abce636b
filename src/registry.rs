use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::fmt::{self, Debug, Formatter};
use parking_lot::Mutex;
use tracing::{debug, debug_span, error};

use crate::{
    any::{BoxAny, RcAny, TypeInfo},
    cache::{Cache, Drained, Resolved, Slot},
    errors::{FinalizeErrorKind, InstantiateErrorKind, ResolveErrorKind},
    finalizer::BoxedFinalizer,
    instantiator::{BoxedCloneInstantiator, BoxedInstantiator, FromRegistry, Instantiator},
    key::{Key, Name},
    service::Service as _,
    Provider,
};

#[derive(Clone)]
pub(crate) struct InstantiatorData {
    pub(crate) instantiator: BoxedInstantiator,
    pub(crate) finalizer: Option<BoxedFinalizer>,
}

#[derive(Default)]
pub(crate) struct RegistryInner {
    pub(crate) entries: BTreeMap<Key, InstantiatorData>,
    pub(crate) cache: Cache,
}

/// Lookup result of a synchronous resolution
enum Lookup {
    Ready(RcAny),
    Build {
        instantiator: BoxedCloneInstantiator,
        finalizer: Option<BoxedFinalizer>,
    },
    #[cfg(feature = "async")]
    NotReady,
    NoInstantiator,
}

impl RegistryInner {
    fn lookup(&self, key: &Key) -> Lookup {
        match self.cache.get(key) {
            Some(Slot::Ready(Resolved { dependency, .. })) => return Lookup::Ready(dependency.clone()),
            #[cfg(feature = "async")]
            Some(Slot::Pending(_)) => return Lookup::NotReady,
            None => {}
        }

        match self.entries.get(key) {
            Some(InstantiatorData {
                instantiator: BoxedInstantiator::Sync(instantiator),
                finalizer,
            }) => Lookup::Build {
                instantiator: instantiator.clone(),
                finalizer: finalizer.clone(),
            },
            #[cfg(feature = "async")]
            Some(InstantiatorData {
                instantiator: BoxedInstantiator::Async(_),
                ..
            }) => Lookup::NotReady,
            None => Lookup::NoInstantiator,
        }
    }
}

/// Lazy dependency registry.
///
/// Maps a key, the type of a dependency with an optional name, to its instantiator and its cached instance.
/// Instances are built on the first resolution and cached until they're removed or the registry is cleared.
///
/// The registry is a cheap to clone handle, clones share the same registrations and cache.
/// Its lock is never held while an instantiator or a finalizer is called,
/// so instantiators can resolve other dependencies from the registry they're resolved from.
///
/// # Examples
/// ```
/// use depot::{InstantiateErrorKind, Registry};
/// use std::sync::Arc;
///
/// struct Config {
///     url: &'static str,
/// }
///
/// struct Client {
///     config: Arc<Config>,
/// }
///
/// let registry = Registry::new();
/// registry
///     .provide(|| Ok::<_, InstantiateErrorKind>(Config { url: "localhost" }))
///     .provide(|registry: Registry| {
///         let config = registry.get::<Config>().map_err(anyhow::Error::from)?;
///         Ok::<_, InstantiateErrorKind>(Client { config })
///     });
///
/// let client = registry.get::<Client>().unwrap();
/// assert_eq!(client.config.url, "localhost");
/// assert!(Arc::ptr_eq(&client, &registry.get::<Client>().unwrap()));
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    pub(crate) inner: Arc<Mutex<RegistryInner>>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the provider, replacing the previous registration under the same key.
    ///
    /// # Warning
    /// An instance cached before the replacement is kept, and it's finalized with the finalizer it was built with.
    pub fn register<Dep: 'static>(&self, provider: Provider<Dep>) -> &Self {
        let key = provider.key();
        let Provider {
            instantiator,
            finalizer,
            instance,
            ..
        } = provider;

        let span = debug_span!("register", dependency = key.type_info.name, name = key.name());
        let _guard = span.enter();

        let mut guard = self.inner.lock();
        if let Some(dependency) = instance {
            guard.cache.insert_ready(key.clone(), dependency, finalizer.clone());
        }
        match guard.entries.insert(key, InstantiatorData { instantiator, finalizer }) {
            Some(_) => debug!("Registration replaced"),
            None => debug!("Registered"),
        }
        self
    }

    #[inline]
    pub fn provide<Inst, Deps>(&self, instantiator: Inst) -> &Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send,
        Deps: FromRegistry + 'static,
    {
        self.register(Provider::new(instantiator))
    }

    #[inline]
    pub fn provide_named<Inst, Deps>(&self, name: impl Into<Name>, instantiator: Inst) -> &Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send,
        Deps: FromRegistry + 'static,
    {
        self.register(Provider::new(instantiator).with_name(name))
    }

    /// Registers an instance created outside the registry, it's cached right away
    #[inline]
    pub fn provide_instance<Dep>(&self, val: Dep) -> &Self
    where
        Dep: Clone + Send + Sync + 'static,
    {
        self.register(Provider::from_instance(val))
    }

    /// Gets a cached instance of the dependency, building and caching it on the first call.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NoInstantiator`] if the dependency isn't registered.
    /// - [`ResolveErrorKind::NotReady`] if its instantiator is async and the instance isn't built yet.
    ///   Use [`Self::get_async`] to build it.
    /// - [`ResolveErrorKind::Instantiate`] if the instantiator failed. Nothing is cached then, so the next call retries.
    #[inline]
    pub fn get<Dep>(&self) -> Result<Arc<Dep>, ResolveErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.resolve(Key::of::<Dep>())
    }

    /// Gets a cached instance of the dependency registered under the name.
    /// See [`Self::get`].
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub fn get_named<Dep>(&self, name: impl Into<Name>) -> Result<Arc<Dep>, ResolveErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.resolve(Key::named::<Dep>(name))
    }

    /// Builds a new instance of the dependency on each call, the cache isn't used.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NoInstantiator`] if the dependency isn't registered.
    /// - [`ResolveErrorKind::NotReady`] if its instantiator is async. Use [`Self::get_transient_async`] instead.
    /// - [`ResolveErrorKind::Instantiate`] if the instantiator failed.
    #[inline]
    pub fn get_transient<Dep: 'static>(&self) -> Result<Dep, ResolveErrorKind> {
        self.resolve_transient(Key::of::<Dep>())
    }

    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub fn get_transient_named<Dep: 'static>(&self, name: impl Into<Name>) -> Result<Dep, ResolveErrorKind> {
        self.resolve_transient(Key::named::<Dep>(name))
    }

    #[inline]
    #[must_use]
    pub fn is_registered<Dep: 'static>(&self) -> bool {
        self.inner.lock().entries.contains_key(&Key::of::<Dep>())
    }

    #[inline]
    #[must_use]
    pub fn is_registered_named<Dep: 'static>(&self, name: impl Into<Name>) -> bool {
        self.inner.lock().entries.contains_key(&Key::named::<Dep>(name))
    }

    /// Checks whether an instance of the dependency is cached
    #[inline]
    #[must_use]
    pub fn is_ready<Dep: 'static>(&self) -> bool {
        self.inner.lock().cache.is_ready(&Key::of::<Dep>())
    }

    #[inline]
    #[must_use]
    pub fn is_ready_named<Dep: 'static>(&self, name: impl Into<Name>) -> bool {
        self.inner.lock().cache.is_ready(&Key::named::<Dep>(name))
    }

    /// Removes the cached instance of the dependency, calling its finalizer.
    /// The registration is kept, so the next resolution builds a new instance.
    ///
    /// Returns the removed instance, or `None` if it wasn't built.
    ///
    /// # Errors
    /// - [`FinalizeErrorKind::RequiresAsync`] if the instance is still being built or its finalizer is async.
    ///   Nothing is removed then, use [`Self::remove_async`] instead.
    /// - [`FinalizeErrorKind::Custom`] if the finalizer failed. The instance is removed anyway.
    #[inline]
    pub fn remove<Dep>(&self) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.remove_by_key(&Key::of::<Dep>(), false)?.map(downcast_removed).transpose()
    }

    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub fn remove_named<Dep>(&self, name: impl Into<Name>) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.remove_by_key(&Key::named::<Dep>(name), false)?
            .map(downcast_removed)
            .transpose()
    }

    /// Removes the cached instance like [`Self::remove`] and the registration itself
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub fn unregister<Dep>(&self) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.remove_by_key(&Key::of::<Dep>(), true)?.map(downcast_removed).transpose()
    }

    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub fn unregister_named<Dep>(&self, name: impl Into<Name>) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.remove_by_key(&Key::named::<Dep>(name), true)?
            .map(downcast_removed)
            .transpose()
    }

    /// Removes all registrations and cached instances, calling finalizers in LIFO order of their resolution.
    ///
    /// # Errors
    /// - [`FinalizeErrorKind::RequiresAsync`] if some instance is still being built or its finalizer is async.
    ///   Nothing is removed then, use [`Self::clear_async`] instead.
    /// - [`FinalizeErrorKind::Custom`] with the first finalizer error.
    ///   The remaining finalizers are still called and the registry is empty anyway.
    pub fn clear(&self) -> Result<(), FinalizeErrorKind> {
        let span = debug_span!("clear");
        let _guard = span.enter();

        let Drained { resolved, .. } = {
            let mut guard = self.inner.lock();
            if let Some(key) = guard.cache.first_requiring_async() {
                let err = FinalizeErrorKind::RequiresAsync { key: key.clone() };
                error!("{}", err);
                return Err(err);
            }
            guard.entries.clear();
            guard.cache.drain()
        };
        debug!(count = resolved.len(), "Registry cleared, finalizing");

        let mut result = Ok(());
        for (key, resolved) in resolved {
            if let Err(err) = resolved.finalize(&key) {
                error!(%key, "{}", err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    /// Number of registrations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl Registry {
    fn resolve<Dep>(&self, key: Key) -> Result<Arc<Dep>, ResolveErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        let span = debug_span!("resolve", dependency = key.type_info.name, name = key.name());
        let _guard = span.enter();

        let lookup = self.inner.lock().lookup(&key);
        match lookup {
            Lookup::Ready(dependency) => {
                debug!("Found in cache");
                downcast_cached(dependency)
            }
            Lookup::Build { instantiator, finalizer } => {
                debug!("Not found in cache");
                let dependency: RcAny = Arc::new(self.instantiate::<Dep>(instantiator)?);
                let dependency = self.inner.lock().cache.insert_ready(key, dependency, finalizer);
                debug!("Cached");
                downcast_cached(dependency)
            }
            #[cfg(feature = "async")]
            Lookup::NotReady => {
                let err = ResolveErrorKind::NotReady { key };
                error!("{}", err);
                Err(err)
            }
            Lookup::NoInstantiator => {
                let err = ResolveErrorKind::NoInstantiator { key };
                error!("{}", err);
                Err(err)
            }
        }
    }

    fn resolve_transient<Dep: 'static>(&self, key: Key) -> Result<Dep, ResolveErrorKind> {
        let span = debug_span!("resolve_transient", dependency = key.type_info.name, name = key.name());
        let _guard = span.enter();

        let data = self.inner.lock().entries.get(&key).cloned();
        match data {
            Some(InstantiatorData {
                instantiator: BoxedInstantiator::Sync(instantiator),
                ..
            }) => self.instantiate(instantiator),
            #[cfg(feature = "async")]
            Some(InstantiatorData {
                instantiator: BoxedInstantiator::Async(_),
                ..
            }) => {
                let err = ResolveErrorKind::NotReady { key };
                error!("{}", err);
                Err(err)
            }
            None => {
                let err = ResolveErrorKind::NoInstantiator { key };
                error!("{}", err);
                Err(err)
            }
        }
    }

    pub(crate) fn instantiate<Dep: 'static>(&self, mut instantiator: BoxedCloneInstantiator) -> Result<Dep, ResolveErrorKind> {
        match instantiator.call(self.clone()) {
            Ok(dependency) => downcast_instantiated(dependency),
            Err(err) => {
                error!("{}", err);
                Err(ResolveErrorKind::Instantiate(Arc::new(err)))
            }
        }
    }

    /// Takes the cached instance out of the cache and finalizes it
    fn remove_by_key(&self, key: &Key, unregister: bool) -> Result<Option<RcAny>, FinalizeErrorKind> {
        let span = debug_span!("remove", dependency = key.type_info.name, name = key.name());
        let _guard = span.enter();

        let resolved = {
            let mut guard = self.inner.lock();
            let resolved = match guard.cache.take_sync(key) {
                Ok(resolved) => resolved,
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            };
            if unregister && guard.entries.remove(key).is_some() {
                debug!("Unregistered");
            }
            resolved
        };

        match resolved {
            Some(resolved) => match resolved.finalize(key) {
                Ok(dependency) => Ok(Some(dependency)),
                Err(err) => {
                    error!("{}", err);
                    Err(err)
                }
            },
            None => {
                debug!("Not found in cache, nothing to finalize");
                Ok(None)
            }
        }
    }
}

pub(crate) fn downcast_instantiated<Dep: 'static>(dependency: BoxAny) -> Result<Dep, ResolveErrorKind> {
    match dependency.downcast::<Dep>() {
        Ok(dependency) => Ok(*dependency),
        Err(incorrect_type) => {
            let err = ResolveErrorKind::IncorrectType {
                expected: TypeInfo::of::<Dep>(),
                actual: (*incorrect_type).type_id(),
            };
            error!("{}", err);
            Err(err)
        }
    }
}

pub(crate) fn downcast_cached<Dep>(dependency: RcAny) -> Result<Arc<Dep>, ResolveErrorKind>
where
    Dep: Send + Sync + 'static,
{
    match dependency.downcast::<Dep>() {
        Ok(dependency) => Ok(dependency),
        Err(incorrect_type) => {
            let err = ResolveErrorKind::IncorrectType {
                expected: TypeInfo::of::<Dep>(),
                actual: (*incorrect_type).type_id(),
            };
            error!("{}", err);
            Err(err)
        }
    }
}

pub(crate) fn downcast_removed<Dep>(dependency: RcAny) -> Result<Arc<Dep>, FinalizeErrorKind>
where
    Dep: Send + Sync + 'static,
{
    dependency.downcast::<Dep>().map_err(|incorrect_type| FinalizeErrorKind::IncorrectType {
        expected: TypeInfo::of::<Dep>(),
        actual: (*incorrect_type).type_id(),
    })
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        f.debug_struct("Registry")
            .field("entries", &guard.entries.keys().collect::<Vec<_>>())
            .field("cached", &guard.cache.len())
            .finish()
    }
}
