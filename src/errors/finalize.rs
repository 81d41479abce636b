use core::any::TypeId;

use crate::{any::TypeInfo, key::Key};

#[derive(thiserror::Error, Debug)]
pub enum FinalizeErrorKind {
    #[error(
        "\
        Finalization of {key} needs to be awaited. \
        The instance is still being instantiated or its finalizer is async, use an async method instead\
        "
    )]
    RequiresAsync { key: Key },
    #[error("Incorrect instance type. Actual: {actual:?}, expected: {expected}")]
    IncorrectType { expected: TypeInfo, actual: TypeId },
    /// The finalizer failed. The error is passed through unchanged.
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
