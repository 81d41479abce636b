/// Cleanup capability of a dependency.
///
/// Types implementing it can be registered with [`Provider::with_dispose`](crate::Provider::with_dispose)
/// instead of passing a finalizer closure.
pub trait Dispose {
    fn dispose(&self);
}
