use alloc::sync::Arc;
use tracing::{debug, debug_span, error, Instrument as _};

use super::{
    instantiator::{BoxedCloneInstantiator, Instantiator},
    pending::{Building, PendingHandle},
    service::Service as _,
};
use crate::{
    any::RcAny,
    cache::{Drained, Resolved, Slot},
    errors::{FinalizeErrorKind, InstantiateErrorKind, ResolveErrorKind},
    finalizer::BoxedFinalizer,
    instantiator::{BoxedInstantiator, FromRegistry},
    key::{Key, Name},
    registry::{downcast_cached, downcast_instantiated, downcast_removed, InstantiatorData},
    Provider, Registry,
};

/// Lookup result of an async resolution
enum Lookup {
    Ready(RcAny),
    /// Another caller is building the instance
    Pending(PendingHandle),
    /// The instantiator is sync, so it's built without marking the slot pending
    Build {
        instantiator: crate::instantiator::BoxedCloneInstantiator,
        finalizer: Option<BoxedFinalizer>,
    },
    /// The slot is marked pending and this caller builds the instance
    Start {
        instantiator: BoxedCloneInstantiator,
        building: Building,
    },
    NoInstantiator,
}

impl Registry {
    /// Registers an async instantiator.
    /// See [`Provider::new_async`].
    #[inline]
    pub fn provide_async<Inst, Deps>(&self, instantiator: Inst) -> &Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send,
        Deps: FromRegistry + Send + 'static,
    {
        self.register(Provider::new_async(instantiator))
    }

    #[inline]
    pub fn provide_named_async<Inst, Deps>(&self, name: impl Into<Name>, instantiator: Inst) -> &Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send,
        Deps: FromRegistry + Send + 'static,
    {
        self.register(Provider::new_async(instantiator).with_name(name))
    }

    /// Gets a cached instance of the dependency, building and caching it on the first call.
    /// Both sync and async instantiators are supported.
    ///
    /// Concurrent calls for the same key share one instantiation:
    /// the first caller builds the instance, while the others wait for it and get the same instance or the same error.
    ///
    /// # Warning
    /// If the instantiator never completes, all the callers wait forever, no timeout is applied.
    /// If the building call is cancelled, one of the waiting callers starts a new instantiation.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NoInstantiator`] if the dependency isn't registered.
    /// - [`ResolveErrorKind::Instantiate`] if the instantiator failed. Nothing is cached then, so the next call retries.
    #[inline]
    pub async fn get_async<Dep>(&self) -> Result<Arc<Dep>, ResolveErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.resolve_async(Key::of::<Dep>()).await
    }

    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_named_async<Dep>(&self, name: impl Into<Name>) -> Result<Arc<Dep>, ResolveErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.resolve_async(Key::named::<Dep>(name)).await
    }

    /// Builds a new instance of the dependency on each call, the cache isn't used.
    /// Concurrent calls aren't deduplicated.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NoInstantiator`] if the dependency isn't registered.
    /// - [`ResolveErrorKind::Instantiate`] if the instantiator failed.
    #[inline]
    pub async fn get_transient_async<Dep: 'static>(&self) -> Result<Dep, ResolveErrorKind> {
        self.resolve_transient_async(Key::of::<Dep>()).await
    }

    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_transient_named_async<Dep: 'static>(&self, name: impl Into<Name>) -> Result<Dep, ResolveErrorKind> {
        self.resolve_transient_async(Key::named::<Dep>(name)).await
    }

    /// Removes the cached instance of the dependency, awaiting its finalizer.
    /// If the instance is being built, waits for it and removes the built instance.
    /// The registration is kept, so the next resolution builds a new instance.
    ///
    /// Returns the removed instance, or `None` if it wasn't built or its instantiation failed.
    ///
    /// # Errors
    /// Returns [`FinalizeErrorKind::Custom`] if the finalizer failed. The instance is removed anyway.
    #[inline]
    pub async fn remove_async<Dep>(&self) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.remove_by_key_async(&Key::of::<Dep>(), false)
            .await?
            .map(downcast_removed)
            .transpose()
    }

    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn remove_named_async<Dep>(&self, name: impl Into<Name>) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.remove_by_key_async(&Key::named::<Dep>(name), false)
            .await?
            .map(downcast_removed)
            .transpose()
    }

    /// Removes the cached instance like [`Self::remove_async`] and the registration itself
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn unregister_async<Dep>(&self) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.remove_by_key_async(&Key::of::<Dep>(), true)
            .await?
            .map(downcast_removed)
            .transpose()
    }

    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn unregister_named_async<Dep>(&self, name: impl Into<Name>) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        self.remove_by_key_async(&Key::named::<Dep>(name), true)
            .await?
            .map(downcast_removed)
            .transpose()
    }

    /// Removes all registrations and cached instances, awaiting finalizers.
    /// Instances being built are awaited and finalized first, then the cached ones in LIFO order of their resolution.
    ///
    /// # Errors
    /// Returns [`FinalizeErrorKind::Custom`] with the first finalizer error.
    /// The remaining finalizers are still called and the registry is empty anyway.
    pub async fn clear_async(&self) -> Result<(), FinalizeErrorKind> {
        async {
            let Drained { resolved, pending } = {
                let mut guard = self.inner.lock();
                guard.entries.clear();
                guard.cache.drain()
            };
            debug!(count = resolved.len(), pending = pending.len(), "Registry cleared, finalizing");

            let mut result = Ok(());
            for (key, handle) in pending {
                let Some(Ok(dependency)) = handle.wait().await else {
                    debug!(%key, "Instantiation didn't complete, nothing to finalize");
                    continue;
                };
                let resolved = Resolved {
                    dependency,
                    finalizer: handle.finalizer,
                    order: 0,
                };
                if let Err(err) = resolved.finalize_async(&key).await {
                    error!(%key, "{}", err);
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
            }
            for (key, resolved) in resolved {
                if let Err(err) = resolved.finalize_async(&key).await {
                    error!(%key, "{}", err);
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
            }
            result
        }
        .instrument(debug_span!("clear"))
        .await
    }
}

impl Registry {
    fn lookup_async(&self, key: &Key) -> Lookup {
        let mut guard = self.inner.lock();
        match guard.cache.get(key) {
            Some(Slot::Ready(Resolved { dependency, .. })) => return Lookup::Ready(dependency.clone()),
            Some(Slot::Pending(handle)) => return Lookup::Pending(handle.clone()),
            None => {}
        }

        let Some(InstantiatorData { instantiator, finalizer }) = guard.entries.get(key).cloned() else {
            return Lookup::NoInstantiator;
        };
        match instantiator {
            BoxedInstantiator::Sync(instantiator) => Lookup::Build { instantiator, finalizer },
            BoxedInstantiator::Async(instantiator) => {
                let (id, sender) = guard.cache.insert_pending(key.clone(), finalizer.clone());
                drop(guard);

                Lookup::Start {
                    instantiator,
                    building: Building::new(self.clone(), key.clone(), id, finalizer, sender),
                }
            }
        }
    }

    async fn resolve_async<Dep>(&self, key: Key) -> Result<Arc<Dep>, ResolveErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        let span = debug_span!("resolve", dependency = key.type_info.name, name = key.name());

        async move {
            loop {
                match self.lookup_async(&key) {
                    Lookup::Ready(dependency) => {
                        debug!("Found in cache");
                        return downcast_cached(dependency);
                    }
                    Lookup::Pending(handle) => {
                        debug!("Instantiation in progress, waiting for it");
                        match handle.wait().await {
                            Some(result) => return result.and_then(downcast_cached),
                            None => debug!("Instantiation was cancelled, retrying"),
                        }
                    }
                    Lookup::Build { instantiator, finalizer } => {
                        debug!("Not found in cache");
                        let dependency: RcAny = Arc::new(self.instantiate::<Dep>(instantiator)?);
                        let dependency = self.inner.lock().cache.insert_ready(key, dependency, finalizer);
                        debug!("Cached");
                        return downcast_cached(dependency);
                    }
                    Lookup::Start { instantiator, building } => {
                        debug!("Not found in cache");
                        let result = self
                            .instantiate_async::<Dep>(instantiator)
                            .await
                            .map(|dependency| Arc::new(dependency) as RcAny);
                        return building.complete(result).and_then(downcast_cached);
                    }
                    Lookup::NoInstantiator => {
                        let err = ResolveErrorKind::NoInstantiator { key };
                        error!("{}", err);
                        return Err(err);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn resolve_transient_async<Dep: 'static>(&self, key: Key) -> Result<Dep, ResolveErrorKind> {
        let span = debug_span!("resolve_transient", dependency = key.type_info.name, name = key.name());

        async move {
            let data = self.inner.lock().entries.get(&key).cloned();
            match data {
                Some(InstantiatorData {
                    instantiator: BoxedInstantiator::Sync(instantiator),
                    ..
                }) => self.instantiate(instantiator),
                Some(InstantiatorData {
                    instantiator: BoxedInstantiator::Async(instantiator),
                    ..
                }) => self.instantiate_async(instantiator).await,
                None => {
                    let err = ResolveErrorKind::NoInstantiator { key };
                    error!("{}", err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn instantiate_async<Dep: 'static>(&self, mut instantiator: BoxedCloneInstantiator) -> Result<Dep, ResolveErrorKind> {
        match instantiator.call(self.clone()).await {
            Ok(dependency) => downcast_instantiated(dependency),
            Err(err) => {
                error!("{}", err);
                Err(ResolveErrorKind::Instantiate(Arc::new(err)))
            }
        }
    }

    /// Takes the cached instance out of the cache and finalizes it, waiting for the instance being built first
    async fn remove_by_key_async(&self, key: &Key, unregister: bool) -> Result<Option<RcAny>, FinalizeErrorKind> {
        let span = debug_span!("remove", dependency = key.type_info.name, name = key.name());

        async move {
            loop {
                let slot = {
                    let mut guard = self.inner.lock();
                    if unregister && guard.entries.remove(key).is_some() {
                        debug!("Unregistered");
                    }
                    guard.cache.take_settled(key)
                };

                match slot {
                    Some(Slot::Ready(resolved)) => {
                        return match resolved.finalize_async(key).await {
                            Ok(dependency) => Ok(Some(dependency)),
                            Err(err) => {
                                error!("{}", err);
                                Err(err)
                            }
                        };
                    }
                    Some(Slot::Pending(handle)) => {
                        debug!("Instantiation in progress, waiting for it");
                        let _ = handle.wait().await;
                    }
                    None => {
                        debug!("Not found in cache, nothing to finalize");
                        return Ok(None);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}
