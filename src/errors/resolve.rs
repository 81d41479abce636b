use alloc::sync::Arc;
use core::any::TypeId;

use super::InstantiateErrorKind;
use crate::{any::TypeInfo, key::Key};

#[derive(thiserror::Error, Debug, Clone)]
pub enum ResolveErrorKind {
    #[error("Instantiator not found in registry for {key}")]
    NoInstantiator { key: Key },
    #[error(
        "\
        Instance of {key} isn't ready. \
        Its instantiator is async, so it can only be resolved synchronously after it was resolved with an async method\
        "
    )]
    NotReady { key: Key },
    #[error("Incorrect instance type. Actual: {actual:?}, expected: {expected}")]
    IncorrectType { expected: TypeInfo, actual: TypeId },
    /// The instantiator failed.
    /// Shared, because every caller waiting on the same in-flight instantiation observes the same error.
    #[error(transparent)]
    Instantiate(Arc<InstantiateErrorKind>),
}

impl ResolveErrorKind {
    /// Key of the registration that failed to resolve, if the error is tied to one
    #[must_use]
    pub const fn key(&self) -> Option<&Key> {
        match self {
            Self::NoInstantiator { key } | Self::NotReady { key } => Some(key),
            Self::IncorrectType { .. } | Self::Instantiate(_) => None,
        }
    }
}
