//! Deduplication of in-flight async instantiations.
//!
//! The first caller to find a singleton slot absent installs a pending slot and becomes the builder.
//! Callers finding the slot pending wait on its handle instead of starting a second instantiation,
//! and observe the same instance or the same error once the builder settles it.

use tokio::sync::watch;
use tracing::debug;

use crate::{any::RcAny, errors::ResolveErrorKind, finalizer::BoxedFinalizer, key::Key, Registry};

/// Outcome of a pending instantiation, `None` until it settles
pub(crate) type Outcome = Option<Result<RcAny, ResolveErrorKind>>;

#[derive(Clone)]
pub(crate) struct PendingHandle {
    pub(crate) id: u64,
    /// Finalizer of the instantiator that is building the instance
    pub(crate) finalizer: Option<BoxedFinalizer>,
    receiver: watch::Receiver<Outcome>,
}

#[must_use]
pub(crate) fn channel(id: u64, finalizer: Option<BoxedFinalizer>) -> (PendingHandle, watch::Sender<Outcome>) {
    let (sender, receiver) = watch::channel(None);
    (PendingHandle { id, finalizer, receiver }, sender)
}

impl PendingHandle {
    /// Waits until the instantiation settles.
    /// Returns `None` if the builder was dropped before settling it; the slot is reverted to absent in that case.
    pub(crate) async fn wait(&self) -> Outcome {
        let mut receiver = self.receiver.clone();
        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        outcome
    }
}

/// Builder side of a pending slot.
///
/// If it's dropped without being completed (the resolving future was cancelled),
/// the pending slot is removed and waiters retry the resolution.
pub(crate) struct Building {
    registry: Registry,
    key: Key,
    id: u64,
    finalizer: Option<BoxedFinalizer>,
    sender: Option<watch::Sender<Outcome>>,
}

impl Building {
    #[inline]
    #[must_use]
    pub(crate) fn new(registry: Registry, key: Key, id: u64, finalizer: Option<BoxedFinalizer>, sender: watch::Sender<Outcome>) -> Self {
        Self {
            registry,
            key,
            id,
            finalizer,
            sender: Some(sender),
        }
    }

    /// Settles the pending slot with the result of the instantiation and notifies waiters
    pub(crate) fn complete(mut self, result: Result<RcAny, ResolveErrorKind>) -> Result<RcAny, ResolveErrorKind> {
        self.registry
            .inner
            .lock()
            .cache
            .settle_pending(&self.key, self.id, &result, self.finalizer.take());

        if let Some(sender) = self.sender.take() {
            sender.send_replace(Some(result.clone()));
        }
        result
    }
}

impl Drop for Building {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.registry.inner.lock().cache.abandon_pending(&self.key, self.id);
            debug!(key = %self.key, "Instantiation dropped before completion");
        }
    }
}
