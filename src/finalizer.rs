use alloc::sync::Arc;

use crate::{
    any::{RcAny, TypeInfo},
    errors::FinalizeErrorKind,
    service::{service_fn, BoxCloneService},
};

/// Cleanup hook called with a materialized instance when it's removed from the registry.
///
/// Implemented for closures `FnMut(Arc<Dep>)` returning either `()` or `Result<(), E>`.
pub trait Finalizer<Dep>: Clone + 'static {
    #[allow(clippy::missing_errors_doc)]
    fn finalize(&mut self, dependency: Arc<Dep>) -> Result<(), anyhow::Error>;
}

/// Value a finalizer closure can return
pub trait IntoFinalizeResult {
    #[allow(clippy::missing_errors_doc)]
    fn into_finalize_result(self) -> Result<(), anyhow::Error>;
}

impl IntoFinalizeResult for () {
    #[inline]
    fn into_finalize_result(self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

impl<E> IntoFinalizeResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    #[inline]
    fn into_finalize_result(self) -> Result<(), anyhow::Error> {
        self.map_err(Into::into)
    }
}

impl<F, R, Dep> Finalizer<Dep> for F
where
    F: FnMut(Arc<Dep>) -> R + Clone + 'static,
    R: IntoFinalizeResult,
{
    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) -> Result<(), anyhow::Error> {
        self(dependency).into_finalize_result()
    }
}

pub(crate) type BoxedCloneFinalizer = BoxCloneService<RcAny, (), FinalizeErrorKind>;

#[must_use]
pub(crate) fn boxed_finalizer<Dep, Fin>(mut finalizer: Fin) -> BoxedCloneFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep> + Send + Sync,
{
    BoxCloneService::new(service_fn(move |dependency: RcAny| -> Result<(), FinalizeErrorKind> {
        let dependency = dependency.downcast::<Dep>().map_err(|incorrect| FinalizeErrorKind::IncorrectType {
            expected: TypeInfo::of::<Dep>(),
            actual: (*incorrect).type_id(),
        })?;
        finalizer.finalize(dependency).map_err(FinalizeErrorKind::Custom)
    }))
}

/// Finalizer of either flavor, as it's stored in the registry
#[derive(Clone)]
pub(crate) enum BoxedFinalizer {
    Sync(BoxedCloneFinalizer),
    #[cfg(feature = "async")]
    Async(crate::async_impl::finalizer::BoxedCloneFinalizer),
}

impl BoxedFinalizer {
    #[inline]
    #[must_use]
    pub(crate) const fn is_async(&self) -> bool {
        match self {
            Self::Sync(_) => false,
            #[cfg(feature = "async")]
            Self::Async(_) => true,
        }
    }
}
