//! Process-wide registry.
//!
//! The functions of this module forward to the registry returned by [`global`],
//! so dependencies can be registered and resolved without passing a registry around.
//! Code that needs isolation, like tests, should create its own [`Registry`] instead.

use alloc::sync::Arc;
use std::sync::OnceLock;

use crate::{
    errors::{FinalizeErrorKind, InstantiateErrorKind, ResolveErrorKind},
    instantiator::{FromRegistry, Instantiator},
    key::Name,
    Provider, Registry,
};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Process-wide registry, created on the first call
#[inline]
#[must_use]
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::new)
}

/// See [`Registry::register`]
#[inline]
pub fn register<Dep: 'static>(provider: Provider<Dep>) {
    global().register(provider);
}

/// See [`Registry::provide`]
#[inline]
pub fn provide<Inst, Deps>(instantiator: Inst)
where
    Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
    Inst::Provides: Send,
    Deps: FromRegistry + 'static,
{
    global().provide(instantiator);
}

/// See [`Registry::provide_named`]
#[inline]
pub fn provide_named<Inst, Deps>(name: impl Into<Name>, instantiator: Inst)
where
    Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
    Inst::Provides: Send,
    Deps: FromRegistry + 'static,
{
    global().provide_named(name, instantiator);
}

/// See [`Registry::provide_instance`]
#[inline]
pub fn provide_instance<Dep>(val: Dep)
where
    Dep: Clone + Send + Sync + 'static,
{
    global().provide_instance(val);
}

/// See [`Registry::get`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn get<Dep>() -> Result<Arc<Dep>, ResolveErrorKind>
where
    Dep: Send + Sync + 'static,
{
    global().get()
}

/// See [`Registry::get_named`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn get_named<Dep>(name: impl Into<Name>) -> Result<Arc<Dep>, ResolveErrorKind>
where
    Dep: Send + Sync + 'static,
{
    global().get_named(name)
}

/// See [`Registry::get_transient`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn get_transient<Dep: 'static>() -> Result<Dep, ResolveErrorKind> {
    global().get_transient()
}

/// See [`Registry::get_transient_named`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn get_transient_named<Dep: 'static>(name: impl Into<Name>) -> Result<Dep, ResolveErrorKind> {
    global().get_transient_named(name)
}

/// See [`Registry::is_registered`]
#[inline]
#[must_use]
pub fn is_registered<Dep: 'static>() -> bool {
    global().is_registered::<Dep>()
}

#[inline]
#[must_use]
pub fn is_registered_named<Dep: 'static>(name: impl Into<Name>) -> bool {
    global().is_registered_named::<Dep>(name)
}

/// See [`Registry::is_ready`]
#[inline]
#[must_use]
pub fn is_ready<Dep: 'static>() -> bool {
    global().is_ready::<Dep>()
}

#[inline]
#[must_use]
pub fn is_ready_named<Dep: 'static>(name: impl Into<Name>) -> bool {
    global().is_ready_named::<Dep>(name)
}

/// See [`Registry::remove`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn remove<Dep>() -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
where
    Dep: Send + Sync + 'static,
{
    global().remove()
}

/// See [`Registry::remove_named`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn remove_named<Dep>(name: impl Into<Name>) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
where
    Dep: Send + Sync + 'static,
{
    global().remove_named(name)
}

/// See [`Registry::unregister`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn unregister<Dep>() -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
where
    Dep: Send + Sync + 'static,
{
    global().unregister()
}

/// See [`Registry::unregister_named`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn unregister_named<Dep>(name: impl Into<Name>) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
where
    Dep: Send + Sync + 'static,
{
    global().unregister_named(name)
}

/// See [`Registry::clear`]
#[inline]
#[allow(clippy::missing_errors_doc)]
pub fn clear() -> Result<(), FinalizeErrorKind> {
    global().clear()
}

#[cfg(feature = "async")]
mod async_impl {
    use alloc::sync::Arc;

    use super::global;
    use crate::{
        async_impl::Instantiator,
        errors::{FinalizeErrorKind, InstantiateErrorKind, ResolveErrorKind},
        instantiator::FromRegistry,
        key::Name,
    };

    /// See [`crate::Registry::provide_async`]
    #[inline]
    pub fn provide_async<Inst, Deps>(instantiator: Inst)
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send,
        Deps: FromRegistry + Send + 'static,
    {
        global().provide_async(instantiator);
    }

    /// See [`crate::Registry::provide_named_async`]
    #[inline]
    pub fn provide_named_async<Inst, Deps>(name: impl Into<Name>, instantiator: Inst)
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send,
        Deps: FromRegistry + Send + 'static,
    {
        global().provide_named_async(name, instantiator);
    }

    /// See [`crate::Registry::get_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_async<Dep>() -> Result<Arc<Dep>, ResolveErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        global().get_async().await
    }

    /// See [`crate::Registry::get_named_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_named_async<Dep>(name: impl Into<Name>) -> Result<Arc<Dep>, ResolveErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        global().get_named_async(name).await
    }

    /// See [`crate::Registry::get_transient_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_transient_async<Dep: 'static>() -> Result<Dep, ResolveErrorKind> {
        global().get_transient_async().await
    }

    /// See [`crate::Registry::get_transient_named_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_transient_named_async<Dep: 'static>(name: impl Into<Name>) -> Result<Dep, ResolveErrorKind> {
        global().get_transient_named_async(name).await
    }

    /// See [`crate::Registry::remove_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn remove_async<Dep>() -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        global().remove_async().await
    }

    /// See [`crate::Registry::remove_named_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn remove_named_async<Dep>(name: impl Into<Name>) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        global().remove_named_async(name).await
    }

    /// See [`crate::Registry::unregister_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn unregister_async<Dep>() -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        global().unregister_async().await
    }

    /// See [`crate::Registry::unregister_named_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn unregister_named_async<Dep>(name: impl Into<Name>) -> Result<Option<Arc<Dep>>, FinalizeErrorKind>
    where
        Dep: Send + Sync + 'static,
    {
        global().unregister_named_async(name).await
    }

    /// See [`crate::Registry::clear_async`]
    #[inline]
    #[allow(clippy::missing_errors_doc)]
    pub async fn clear_async() -> Result<(), FinalizeErrorKind> {
        global().clear_async().await
    }
}

#[cfg(feature = "async")]
pub use async_impl::{
    clear_async, get_async, get_named_async, get_transient_async, get_transient_named_async, provide_async, provide_named_async,
    remove_async, remove_named_async, unregister_async, unregister_named_async,
};
