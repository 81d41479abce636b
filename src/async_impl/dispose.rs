use core::future::Future;

/// Async cleanup capability of a dependency.
///
/// Types implementing it can be registered with [`Provider::with_async_dispose`](crate::Provider::with_async_dispose).
pub trait Dispose {
    fn dispose(&self) -> impl Future<Output = ()> + Send;
}
