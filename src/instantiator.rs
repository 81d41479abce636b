use alloc::boxed::Box;
use tracing::debug;

use crate::{
    any::BoxAny,
    errors::InstantiateErrorKind,
    service::{service_fn, BoxCloneService},
    Registry,
};

/// Zero-argument producer of a dependency.
///
/// Implemented for closures `FnMut() -> Result<T, E>` and `FnMut(Registry) -> Result<T, E>`;
/// the latter receives a handle to the registry it was resolved from, so it can resolve other dependencies.
pub trait Instantiator<Deps>: Clone + 'static
where
    Deps: FromRegistry,
{
    type Provides: 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&mut self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;
}

/// Arguments an instantiator is called with, extracted from the registry resolving it
pub trait FromRegistry: Sized {
    fn from_registry(registry: &Registry) -> Self;
}

impl FromRegistry for () {
    #[inline]
    fn from_registry(_registry: &Registry) -> Self {}
}

impl FromRegistry for (Registry,) {
    #[inline]
    fn from_registry(registry: &Registry) -> Self {
        (registry.clone(),)
    }
}

impl<F, Response, Err> Instantiator<()> for F
where
    F: FnMut() -> Result<Response, Err> + Clone + 'static,
    Response: 'static,
    Err: Into<InstantiateErrorKind>,
{
    type Provides = Response;
    type Error = Err;

    #[inline]
    fn instantiate(&mut self, (): ()) -> Result<Self::Provides, Self::Error> {
        self()
    }
}

impl<F, Response, Err> Instantiator<(Registry,)> for F
where
    F: FnMut(Registry) -> Result<Response, Err> + Clone + 'static,
    Response: 'static,
    Err: Into<InstantiateErrorKind>,
{
    type Provides = Response;
    type Error = Err;

    #[inline]
    fn instantiate(&mut self, (registry,): (Registry,)) -> Result<Self::Provides, Self::Error> {
        self(registry)
    }
}

pub(crate) type BoxedCloneInstantiator = BoxCloneService<Registry, BoxAny, InstantiateErrorKind>;

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(mut instantiator: Inst) -> BoxedCloneInstantiator
where
    Inst: Instantiator<Deps> + Send + Sync,
    Inst::Provides: Send,
    Deps: FromRegistry + 'static,
{
    BoxCloneService::new(service_fn(move |registry: Registry| -> Result<BoxAny, InstantiateErrorKind> {
        let dependencies = Deps::from_registry(&registry);
        let dependency = match instantiator.instantiate(dependencies) {
            Ok(dependency) => dependency,
            Err(err) => return Err(err.into()),
        };

        debug!("Instantiated");

        Ok(Box::new(dependency))
    }))
}

/// Instantiator of either flavor, as it's stored in the registry
#[derive(Clone)]
pub(crate) enum BoxedInstantiator {
    Sync(BoxedCloneInstantiator),
    #[cfg(feature = "async")]
    Async(crate::async_impl::instantiator::BoxedCloneInstantiator),
}

/// Wrapper to create an instantiator that just returns passed value.
/// It can be used when the value was created outside the registry.
#[inline]
#[must_use]
pub fn instance<T>(val: T) -> impl Instantiator<(), Provides = T, Error = InstantiateErrorKind> + Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    move || Ok(val.clone())
}
