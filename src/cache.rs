use alloc::{collections::BTreeMap, vec::Vec};
use tracing::debug;

#[cfg(feature = "async")]
use crate::async_impl::pending::PendingHandle;
use crate::{
    any::RcAny,
    errors::FinalizeErrorKind,
    finalizer::BoxedFinalizer,
    key::Key,
    service::Service as _,
};

/// Materialized instance together with the finalizer of the instantiator that built it
#[derive(Clone)]
pub(crate) struct Resolved {
    pub(crate) dependency: RcAny,
    pub(crate) finalizer: Option<BoxedFinalizer>,
    /// Position in resolution order, used to finalize in LIFO order on clear
    pub(crate) order: u64,
}

impl Resolved {
    #[inline]
    #[must_use]
    pub(crate) fn requires_async(&self) -> bool {
        self.finalizer.as_ref().is_some_and(BoxedFinalizer::is_async)
    }

    /// Calls the finalizer, if any, returning the finalized instance
    pub(crate) fn finalize(self, key: &Key) -> Result<RcAny, FinalizeErrorKind> {
        match self.finalizer {
            None => Ok(self.dependency),
            Some(BoxedFinalizer::Sync(mut finalizer)) => {
                finalizer.call(self.dependency.clone())?;
                debug!(%key, "Finalizer called");
                Ok(self.dependency)
            }
            #[cfg(feature = "async")]
            Some(BoxedFinalizer::Async(_)) => Err(FinalizeErrorKind::RequiresAsync { key: key.clone() }),
        }
    }
}

/// Singleton slot. An absent slot is represented by the absence of the key in the cache.
#[derive(Clone)]
pub(crate) enum Slot {
    Ready(Resolved),
    #[cfg(feature = "async")]
    Pending(PendingHandle),
}

/// Everything taken out of the cache on clear
pub(crate) struct Drained {
    /// Ready instances in LIFO order of their resolution
    pub(crate) resolved: Vec<(Key, Resolved)>,
    #[cfg(feature = "async")]
    pub(crate) pending: Vec<(Key, PendingHandle)>,
}

#[derive(Default)]
pub(crate) struct Cache {
    map: BTreeMap<Key, Slot>,
    next_order: u64,
    #[cfg(feature = "async")]
    next_pending_id: u64,
}

impl Cache {
    #[inline]
    #[must_use]
    pub(crate) fn get(&self, key: &Key) -> Option<&Slot> {
        self.map.get(key)
    }

    #[inline]
    #[must_use]
    pub(crate) fn is_ready(&self, key: &Key) -> bool {
        matches!(self.map.get(key), Some(Slot::Ready(_)))
    }

    /// Caches the instance if the slot is absent, returning the cached one.
    ///
    /// A ready slot keeps its instance. A pending slot is left to its instantiation,
    /// and the given instance is returned without being cached.
    pub(crate) fn insert_ready(&mut self, key: Key, dependency: RcAny, finalizer: Option<BoxedFinalizer>) -> RcAny {
        match self.map.get(&key) {
            Some(Slot::Ready(Resolved { dependency, .. })) => {
                debug!("Already cached, keeping the cached instance");
                return dependency.clone();
            }
            #[cfg(feature = "async")]
            Some(Slot::Pending(_)) => {
                debug!("Instantiation in progress, keeping the pending slot");
                return dependency;
            }
            None => {}
        }

        let order = self.next_order();
        self.map.insert(
            key,
            Slot::Ready(Resolved {
                dependency: dependency.clone(),
                finalizer,
                order,
            }),
        );
        dependency
    }

    /// Takes a ready instance out of the cache, if its finalization doesn't need to be awaited
    pub(crate) fn take_sync(&mut self, key: &Key) -> Result<Option<Resolved>, FinalizeErrorKind> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Slot::Ready(resolved)) if !resolved.requires_async() => match self.map.remove(key) {
                Some(Slot::Ready(resolved)) => Ok(Some(resolved)),
                _ => Ok(None),
            },
            Some(_) => Err(FinalizeErrorKind::RequiresAsync { key: key.clone() }),
        }
    }

    /// First key whose finalization needs to be awaited
    #[must_use]
    pub(crate) fn first_requiring_async(&self) -> Option<&Key> {
        self.map.iter().find_map(|(key, slot)| match slot {
            Slot::Ready(resolved) if !resolved.requires_async() => None,
            _ => Some(key),
        })
    }

    /// Empties the cache, keeping the counters so stale pending ids are never reused
    pub(crate) fn drain(&mut self) -> Drained {
        let mut resolved = Vec::with_capacity(self.map.len());
        #[cfg(feature = "async")]
        let mut pending = Vec::new();

        for (key, slot) in core::mem::take(&mut self.map) {
            match slot {
                Slot::Ready(value) => resolved.push((key, value)),
                #[cfg(feature = "async")]
                Slot::Pending(handle) => pending.push((key, handle)),
            }
        }
        resolved.sort_unstable_by(|(_, a), (_, b)| b.order.cmp(&a.order));

        Drained {
            resolved,
            #[cfg(feature = "async")]
            pending,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    fn next_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }
}

#[cfg(feature = "async")]
mod async_impl {
    use tokio::sync::watch;
    use tracing::debug;

    use super::{Cache, Resolved, Slot};
    use crate::{
        any::RcAny,
        async_impl::{
            pending::{self, Outcome},
            service::Service as _,
        },
        errors::{FinalizeErrorKind, ResolveErrorKind},
        finalizer::BoxedFinalizer,
        key::Key,
        service::Service as _,
    };

    impl Resolved {
        /// Calls the finalizer, if any, awaiting it if it's async
        pub(crate) async fn finalize_async(self, key: &Key) -> Result<RcAny, FinalizeErrorKind> {
            match self.finalizer {
                None => return Ok(self.dependency),
                Some(BoxedFinalizer::Sync(mut finalizer)) => finalizer.call(self.dependency.clone())?,
                Some(BoxedFinalizer::Async(mut finalizer)) => finalizer.call(self.dependency.clone()).await?,
            }
            debug!(%key, "Finalizer called");
            Ok(self.dependency)
        }
    }

    impl Cache {
        /// Marks the slot as pending, returning the id of the pending instantiation and the sender to publish its outcome
        pub(crate) fn insert_pending(&mut self, key: Key, finalizer: Option<BoxedFinalizer>) -> (u64, watch::Sender<Outcome>) {
            let id = self.next_pending_id;
            self.next_pending_id += 1;

            let (handle, sender) = pending::channel(id, finalizer);
            self.map.insert(key, Slot::Pending(handle));
            (id, sender)
        }

        /// Settles the pending instantiation with the given id.
        /// Success makes the slot ready, failure reverts it to absent so a later resolution can retry.
        ///
        /// If the slot was removed or replaced in the meantime, the cache isn't touched.
        pub(crate) fn settle_pending(
            &mut self,
            key: &Key,
            id: u64,
            result: &Result<RcAny, ResolveErrorKind>,
            finalizer: Option<BoxedFinalizer>,
        ) {
            if !self.is_pending_with_id(key, id) {
                debug!("Pending slot was removed before the instantiation settled");
                return;
            }

            match result {
                Ok(dependency) => {
                    let order = self.next_order();
                    self.map.insert(
                        key.clone(),
                        Slot::Ready(Resolved {
                            dependency: dependency.clone(),
                            finalizer,
                            order,
                        }),
                    );
                    debug!("Cached");
                }
                Err(_) => {
                    self.map.remove(key);
                    debug!("Pending slot reverted to absent");
                }
            }
        }

        /// Removes the pending slot with the given id, if it's still there
        pub(crate) fn abandon_pending(&mut self, key: &Key, id: u64) {
            if self.is_pending_with_id(key, id) {
                self.map.remove(key);
                debug!("Pending slot abandoned");
            }
        }

        /// Takes a ready instance out of the cache.
        /// A pending slot stays in place and a clone of its handle is returned to wait on.
        pub(crate) fn take_settled(&mut self, key: &Key) -> Option<Slot> {
            match self.map.get(key)? {
                Slot::Pending(handle) => Some(Slot::Pending(handle.clone())),
                Slot::Ready(_) => self.map.remove(key),
            }
        }

        #[inline]
        fn is_pending_with_id(&self, key: &Key, id: u64) -> bool {
            matches!(self.map.get(key), Some(Slot::Pending(handle)) if handle.id == id)
        }
    }
}
