use alloc::sync::Arc;
use core::future::Future;

use super::service::{service_fn, BoxCloneService};
use crate::{
    any::{RcAny, TypeInfo},
    errors::FinalizeErrorKind,
    finalizer::IntoFinalizeResult,
};

/// Async cleanup hook called with a materialized instance when it's removed from the registry.
///
/// Implemented for closures `FnMut(Arc<Dep>) -> impl Future` whose output is either `()` or `Result<(), E>`.
pub trait Finalizer<Dep>: Clone + 'static {
    fn finalize(&mut self, dependency: Arc<Dep>) -> impl Future<Output = Result<(), anyhow::Error>> + Send;
}

impl<F, Fut, Dep> Finalizer<Dep> for F
where
    F: FnMut(Arc<Dep>) -> Fut + Clone + 'static,
    Fut: Future + Send,
    Fut::Output: IntoFinalizeResult,
{
    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) -> impl Future<Output = Result<(), anyhow::Error>> + Send {
        let finalized = self(dependency);
        async move { finalized.await.into_finalize_result() }
    }
}

pub(crate) type BoxedCloneFinalizer = BoxCloneService<RcAny, (), FinalizeErrorKind>;

#[must_use]
pub(crate) fn boxed_finalizer<Dep, Fin>(finalizer: Fin) -> BoxedCloneFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep> + Send + Sync,
{
    BoxCloneService::new(service_fn(move |dependency: RcAny| {
        let mut finalizer = finalizer.clone();

        async move {
            let dependency = match dependency.downcast::<Dep>() {
                Ok(dependency) => dependency,
                Err(incorrect) => {
                    return Err(FinalizeErrorKind::IncorrectType {
                        expected: TypeInfo::of::<Dep>(),
                        actual: (*incorrect).type_id(),
                    })
                }
            };
            finalizer.finalize(dependency).await.map_err(FinalizeErrorKind::Custom)
        }
    }))
}
