use alloc::boxed::Box;
use core::future::Future;
use tracing::debug;

use super::service::{service_fn, BoxCloneService};
use crate::{any::BoxAny, errors::InstantiateErrorKind, instantiator::FromRegistry, Registry};

/// Zero-argument async producer of a dependency.
///
/// Implemented for closures `FnMut() -> impl Future<Output = Result<T, E>>`
/// and `FnMut(Registry) -> impl Future<Output = Result<T, E>>`.
pub trait Instantiator<Deps>: Clone + 'static
where
    Deps: FromRegistry,
{
    type Provides: 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&mut self, dependencies: Deps) -> impl Future<Output = Result<Self::Provides, Self::Error>> + Send;
}

impl<F, Fut, Response, Err> Instantiator<()> for F
where
    F: FnMut() -> Fut + Clone + 'static,
    Fut: Future<Output = Result<Response, Err>> + Send,
    Response: 'static,
    Err: Into<InstantiateErrorKind>,
{
    type Provides = Response;
    type Error = Err;

    #[inline]
    fn instantiate(&mut self, (): ()) -> impl Future<Output = Result<Self::Provides, Self::Error>> + Send {
        self()
    }
}

impl<F, Fut, Response, Err> Instantiator<(Registry,)> for F
where
    F: FnMut(Registry) -> Fut + Clone + 'static,
    Fut: Future<Output = Result<Response, Err>> + Send,
    Response: 'static,
    Err: Into<InstantiateErrorKind>,
{
    type Provides = Response;
    type Error = Err;

    #[inline]
    fn instantiate(&mut self, (registry,): (Registry,)) -> impl Future<Output = Result<Self::Provides, Self::Error>> + Send {
        self(registry)
    }
}

pub(crate) type BoxedCloneInstantiator = BoxCloneService<Registry, BoxAny, InstantiateErrorKind>;

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedCloneInstantiator
where
    Inst: Instantiator<Deps> + Send + Sync,
    Inst::Provides: Send,
    Deps: FromRegistry + Send + 'static,
{
    BoxCloneService::new(service_fn(move |registry: Registry| {
        let mut instantiator = instantiator.clone();
        let dependencies = Deps::from_registry(&registry);

        async move {
            let dependency = match instantiator.instantiate(dependencies).await {
                Ok(dependency) => dependency,
                Err(err) => return Err::<BoxAny, InstantiateErrorKind>(err.into()),
            };

            debug!("Instantiated");

            Ok(Box::new(dependency) as BoxAny)
        }
    }))
}
